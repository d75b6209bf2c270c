//! The shared call surface.
//!
//! Screens and tools program against [`Operations`] and never learn whether
//! the device is the host (calls execute in-process against the router) or a
//! remote (calls are marshaled over the wire). Both roles implement the one
//! required method; the typed wrappers are shared.

use crate::catalogue::ops;
use crate::error::SyncError;
use crate::identity::DeviceId;
use crate::message::Call;
use crate::model::{Bout, Official, Pool, Referee};
use serde_json::{Value, json};
use std::future::Future;

pub trait Operations: Sync {
    /// Dispatch one catalogue call and resolve with its result.
    fn call(&self, call: Call) -> impl Future<Output = Result<Value, SyncError>> + Send;

    fn get_pools(
        &self,
        round_id: u32,
    ) -> impl Future<Output = Result<Vec<Pool>, SyncError>> + Send {
        async move {
            let v = self
                .call(Call::new(ops::GET_POOLS, json!({ "round_id": round_id })))
                .await?;
            Ok(serde_json::from_value(v)?)
        }
    }

    fn get_bouts_for_pool(
        &self,
        round_id: u32,
        pool_id: u32,
    ) -> impl Future<Output = Result<Vec<Bout>, SyncError>> + Send {
        async move {
            let v = self
                .call(Call::new(
                    ops::GET_BOUTS_FOR_POOL,
                    json!({ "round_id": round_id, "pool_id": pool_id }),
                ))
                .await?;
            Ok(serde_json::from_value(v)?)
        }
    }

    fn get_officials(&self) -> impl Future<Output = Result<Vec<Official>, SyncError>> + Send {
        async move {
            let v = self.call(Call::new(ops::GET_OFFICIALS, Value::Null)).await?;
            Ok(serde_json::from_value(v)?)
        }
    }

    fn get_referees(&self) -> impl Future<Output = Result<Vec<Referee>, SyncError>> + Send {
        async move {
            let v = self.call(Call::new(ops::GET_REFEREES, Value::Null)).await?;
            Ok(serde_json::from_value(v)?)
        }
    }

    fn update_bout_scores(
        &self,
        bout_id: u32,
        score_a: u32,
        score_b: u32,
    ) -> impl Future<Output = Result<Bout, SyncError>> + Send {
        async move {
            let v = self
                .call(Call::new(
                    ops::UPDATE_BOUT_SCORES,
                    json!({ "bout_id": bout_id, "score_a": score_a, "score_b": score_b }),
                ))
                .await?;
            Ok(serde_json::from_value(v)?)
        }
    }

    fn add_official(
        &self,
        name: &str,
        device_id: Option<DeviceId>,
    ) -> impl Future<Output = Result<Official, SyncError>> + Send {
        let args = json!({ "name": name, "device_id": device_id });
        async move {
            let v = self.call(Call::new(ops::ADD_OFFICIAL, args)).await?;
            Ok(serde_json::from_value(v)?)
        }
    }

    fn remove_official(
        &self,
        official_id: u32,
    ) -> impl Future<Output = Result<(), SyncError>> + Send {
        async move {
            self.call(Call::new(
                ops::REMOVE_OFFICIAL,
                json!({ "official_id": official_id }),
            ))
            .await?;
            Ok(())
        }
    }

    fn add_referee(
        &self,
        name: &str,
        device_id: Option<DeviceId>,
    ) -> impl Future<Output = Result<Referee, SyncError>> + Send {
        let args = json!({ "name": name, "device_id": device_id });
        async move {
            let v = self.call(Call::new(ops::ADD_REFEREE, args)).await?;
            Ok(serde_json::from_value(v)?)
        }
    }

    fn remove_referee(
        &self,
        referee_id: u32,
    ) -> impl Future<Output = Result<(), SyncError>> + Send {
        async move {
            self.call(Call::new(
                ops::REMOVE_REFEREE,
                json!({ "referee_id": referee_id }),
            ))
            .await?;
            Ok(())
        }
    }
}
