//! Listed businesses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{BusinessId, GovernorateId};

/// A business listed in the directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: BusinessId,
    pub name: String,
    pub governorate_id: GovernorateId,
    pub owner_phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Business {
    pub fn new(name: impl Into<String>, governorate_id: GovernorateId) -> Self {
        Self {
            id: BusinessId::new_v7(),
            name: name.into(),
            governorate_id,
            owner_phone: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn with_owner_phone(mut self, phone: impl Into<String>) -> Self {
        self.owner_phone = Some(phone.into());
        self
    }
}
