//! Governorates, the unit of territory each manager is responsible for

use serde::{Deserialize, Serialize};

use core_kernel::GovernorateId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Governorate {
    pub id: GovernorateId,
    pub name: String,
    /// Short code such as "BGD" used in settlement numbers
    pub code: String,
}

impl Governorate {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: GovernorateId::new_v7(),
            name: name.into(),
            code: code.into().to_ascii_uppercase(),
        }
    }
}
