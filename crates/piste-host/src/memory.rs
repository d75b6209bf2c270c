//! In-memory store backing the demo daemon and the test suites.
//!
//! Real deployments embed the library and supply their own
//! [`DataAccess`]/[`Roster`] over the tournament database; this one keeps the
//! same catalogue semantics in plain vectors.

use piste_core::{
    Bout, Call, DataAccess, DataAccessError, DeviceId, Official, Pool, Referee, Roster, ops,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

#[derive(Debug, Default)]
pub struct MemoryStore {
    pools: Vec<Pool>,
    bouts: Vec<Bout>,
    officials: Vec<Official>,
    referees: Vec<Referee>,
    next_id: u32,
}

#[derive(Deserialize)]
struct RoundArgs {
    round_id: u32,
}

#[derive(Deserialize)]
struct PoolArgs {
    round_id: u32,
    pool_id: u32,
}

#[derive(Deserialize)]
struct ScoreArgs {
    bout_id: u32,
    score_a: u32,
    score_b: u32,
}

#[derive(Deserialize)]
struct PersonArgs {
    name: String,
    #[serde(default)]
    device_id: Option<DeviceId>,
}

#[derive(Deserialize)]
struct OfficialIdArgs {
    official_id: u32,
}

#[derive(Deserialize)]
struct RefereeIdArgs {
    referee_id: u32,
}

fn parse<T: DeserializeOwned>(args: &Value) -> Result<T, DataAccessError> {
    serde_json::from_value(args.clone())
        .map_err(|e| DataAccessError::new(format!("bad arguments: {e}")))
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, DataAccessError> {
    serde_json::to_value(value).map_err(|e| DataAccessError::new(e.to_string()))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    pub fn seed_pool(&mut self, round_id: u32, number: u32) -> u32 {
        let id = self.allocate_id();
        self.pools.push(Pool {
            id,
            round_id,
            number,
        });
        id
    }

    pub fn seed_bout(&mut self, round_id: u32, pool_id: u32, fencer_a: &str, fencer_b: &str) -> u32 {
        let id = self.allocate_id();
        self.bouts.push(Bout {
            id,
            round_id,
            pool_id,
            fencer_a: fencer_a.to_string(),
            fencer_b: fencer_b.to_string(),
            score_a: 0,
            score_b: 0,
        });
        id
    }

    /// Seed a bout with a fixed id, for tests that reference one by number.
    pub fn seed_bout_with_id(
        &mut self,
        id: u32,
        round_id: u32,
        pool_id: u32,
        fencer_a: &str,
        fencer_b: &str,
    ) {
        self.next_id = self.next_id.max(id);
        self.bouts.push(Bout {
            id,
            round_id,
            pool_id,
            fencer_a: fencer_a.to_string(),
            fencer_b: fencer_b.to_string(),
            score_a: 0,
            score_b: 0,
        });
    }

    pub fn seed_official(&mut self, name: &str, device_id: Option<DeviceId>) -> u32 {
        let id = self.allocate_id();
        self.officials.push(Official {
            id,
            name: name.to_string(),
            device_id,
        });
        id
    }

    pub fn seed_referee(&mut self, name: &str, device_id: Option<DeviceId>) -> u32 {
        let id = self.allocate_id();
        self.referees.push(Referee {
            id,
            name: name.to_string(),
            device_id,
        });
        id
    }

    fn update_bout_scores(&mut self, args: ScoreArgs) -> Result<Value, DataAccessError> {
        let bout = self
            .bouts
            .iter_mut()
            .find(|b| b.id == args.bout_id)
            .ok_or_else(|| DataAccessError::new(format!("no bout {}", args.bout_id)))?;
        bout.score_a = args.score_a;
        bout.score_b = args.score_b;
        to_value(&bout.clone())
    }
}

impl DataAccess for MemoryStore {
    fn execute(&mut self, call: &Call) -> Result<Value, DataAccessError> {
        match call.op.as_str() {
            ops::GET_POOLS => {
                let args: RoundArgs = parse(&call.args)?;
                let pools: Vec<&Pool> = self
                    .pools
                    .iter()
                    .filter(|p| p.round_id == args.round_id)
                    .collect();
                to_value(&pools)
            }
            ops::GET_BOUTS_FOR_POOL => {
                let args: PoolArgs = parse(&call.args)?;
                let bouts: Vec<&Bout> = self
                    .bouts
                    .iter()
                    .filter(|b| b.round_id == args.round_id && b.pool_id == args.pool_id)
                    .collect();
                to_value(&bouts)
            }
            ops::GET_OFFICIALS => to_value(&self.officials),
            ops::GET_REFEREES => to_value(&self.referees),
            ops::UPDATE_BOUT_SCORES => self.update_bout_scores(parse(&call.args)?),
            ops::ADD_OFFICIAL => {
                let args: PersonArgs = parse(&call.args)?;
                let id = self.seed_official(&args.name, args.device_id);
                let official = self.officials.iter().find(|o| o.id == id);
                to_value(&official)
            }
            ops::REMOVE_OFFICIAL => {
                let args: OfficialIdArgs = parse(&call.args)?;
                let before = self.officials.len();
                self.officials.retain(|o| o.id != args.official_id);
                if self.officials.len() == before {
                    return Err(DataAccessError::new(format!(
                        "no official {}",
                        args.official_id
                    )));
                }
                Ok(json!(null))
            }
            ops::ADD_REFEREE => {
                let args: PersonArgs = parse(&call.args)?;
                let id = self.seed_referee(&args.name, args.device_id);
                let referee = self.referees.iter().find(|r| r.id == id);
                to_value(&referee)
            }
            ops::REMOVE_REFEREE => {
                let args: RefereeIdArgs = parse(&call.args)?;
                let before = self.referees.len();
                self.referees.retain(|r| r.id != args.referee_id);
                if self.referees.len() == before {
                    return Err(DataAccessError::new(format!(
                        "no referee {}",
                        args.referee_id
                    )));
                }
                Ok(json!(null))
            }
            other => Err(DataAccessError::new(format!("unsupported operation {other}"))),
        }
    }
}

impl Roster for MemoryStore {
    fn device_may_mutate(&self, device: &DeviceId) -> bool {
        self.officials
            .iter()
            .any(|o| o.device_id.as_ref() == Some(device))
            || self
                .referees
                .iter()
                .any(|r| r.device_id.as_ref() == Some(device))
    }
}
