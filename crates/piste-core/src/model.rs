//! Tournament entities crossing the sync boundary.
//!
//! These are plain rows; the store behind [`DataAccess`](crate::DataAccess)
//! owns their lifecycle.

use crate::identity::DeviceId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub id: u32,
    pub round_id: u32,
    pub number: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bout {
    pub id: u32,
    pub round_id: u32,
    pub pool_id: u32,
    pub fencer_a: String,
    pub fencer_b: String,
    pub score_a: u32,
    pub score_b: u32,
}

/// A tournament official. `device_id` ties a physical device to this record
/// and grants that device mutation rights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Official {
    pub id: u32,
    pub name: String,
    pub device_id: Option<DeviceId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referee {
    pub id: u32,
    pub name: String,
    pub device_id: Option<DeviceId>,
}
