use crate::error::{Result, VyuhaError};
use crate::paths;
use crate::types::{ManeuverAction, ProposedCommand, RiskAssessment, ThrustDirection};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

/// Altitude change per m/s of along-track delta-v.
pub const KM_PER_MS: f64 = 1.76;

pub const MANEUVER_REASON: &str = "collision_avoidance";

// ---------------------------------------------------------------------------
// Position / Velocity / Trajectory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    pub alt_km: f64,
}

impl Default for Position {
    fn default() -> Self {
        Self {
            lat: 0.0,
            lon: 0.0,
            alt_km: 400.0,
        }
    }
}

/// Velocity in m/s; `y` is along-track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for Velocity {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 7800.0,
            z: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub position: Position,
    pub velocity: Velocity,
}

// ---------------------------------------------------------------------------
// AppliedManeuver
// ---------------------------------------------------------------------------

/// An approved command after the ledger has committed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedManeuver {
    pub maneuver_id: Uuid,
    pub cycle_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: ManeuverAction,
    pub thrust_direction: Option<ThrustDirection>,
    pub confidence: f64,
    pub delta_v_ms: f64,
    pub reason: String,
}

/// Burn magnitude for a command at the given collision probability.
pub fn delta_v_for(action: ManeuverAction, collision_probability: f64) -> f64 {
    match action {
        ManeuverAction::HoldPosition => 0.0,
        ManeuverAction::FireThrusters => {
            let severity = ((collision_probability - 0.7) / 0.3).clamp(0.0, 1.0);
            0.5 + 2.0 * severity.powf(1.5)
        }
    }
}

// ---------------------------------------------------------------------------
// SpacecraftState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpacecraftState {
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub velocity: Velocity,
    #[serde(default)]
    pub baseline_trajectory: Trajectory,
    #[serde(default)]
    pub last_maneuver: Option<AppliedManeuver>,
    #[serde(default)]
    pub maneuver_history: Vec<AppliedManeuver>,
    pub updated_at: DateTime<Utc>,
}

impl Default for SpacecraftState {
    fn default() -> Self {
        Self {
            position: Position::default(),
            velocity: Velocity::default(),
            baseline_trajectory: Trajectory::default(),
            last_maneuver: None,
            maneuver_history: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}

impl SpacecraftState {
    /// Missing file means the documented default baseline. A file that exists
    /// but does not parse is an error; it is never silently replaced.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&data).map_err(|e| VyuhaError::CorruptState {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    pub fn on_baseline(&self) -> bool {
        self.last_maneuver.is_none()
    }

    pub fn trajectory(&self) -> Trajectory {
        Trajectory {
            position: self.position,
            velocity: self.velocity,
        }
    }

    // ---------------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------------

    pub fn apply_maneuver(
        &mut self,
        cycle_id: Uuid,
        risk: &RiskAssessment,
        command: &ProposedCommand,
    ) -> AppliedManeuver {
        if self.on_baseline() {
            self.baseline_trajectory = self.trajectory();
        }

        let mut position = Position {
            lat: risk.latitude.unwrap_or(self.position.lat),
            lon: risk.longitude.unwrap_or(self.position.lon),
            alt_km: risk.altitude_km.unwrap_or(self.position.alt_km),
        };
        let delta_v = delta_v_for(command.action, risk.collision_probability);

        match command.thrust_direction {
            Some(ThrustDirection::Prograde) => {
                self.velocity.y += delta_v;
                position.alt_km += KM_PER_MS * delta_v;
            }
            Some(ThrustDirection::Retrograde) => {
                self.velocity.y -= delta_v;
                position.alt_km -= KM_PER_MS * delta_v;
            }
            Some(ThrustDirection::RadialOut) => self.velocity.x += delta_v,
            Some(ThrustDirection::RadialIn) => self.velocity.x -= delta_v,
            Some(ThrustDirection::TowardDebris) | None => {}
        }
        position.alt_km = position.alt_km.max(0.0);
        self.position = position;

        let now = Utc::now();
        let maneuver = AppliedManeuver {
            maneuver_id: Uuid::new_v4(),
            cycle_id,
            timestamp: now,
            action: command.action,
            thrust_direction: command.thrust_direction,
            confidence: command.confidence,
            delta_v_ms: delta_v,
            reason: MANEUVER_REASON.to_string(),
        };
        self.last_maneuver = Some(maneuver.clone());
        self.maneuver_history.push(maneuver.clone());
        self.updated_at = now;
        maneuver
    }

    /// Returns false when already on baseline. History is never touched.
    pub fn restore_baseline(&mut self) -> bool {
        if self.on_baseline() {
            return false;
        }
        self.position = self.baseline_trajectory.position;
        self.velocity = self.baseline_trajectory.velocity;
        self.last_maneuver = None;
        self.updated_at = Utc::now();
        true
    }
}

// ---------------------------------------------------------------------------
// StateLedger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoreOutcome {
    pub state: SpacecraftState,
    pub changed: bool,
}

/// Sole owner of the spacecraft state. Every mutation is persisted before the
/// in-memory copy changes, so a failed write leaves both untouched.
pub struct StateLedger {
    path: PathBuf,
    state: Mutex<SpacecraftState>,
}

impl StateLedger {
    pub fn open(root: &Path) -> Result<Self> {
        Self::open_at(paths::state_path(root))
    }

    pub fn open_at(path: PathBuf) -> Result<Self> {
        let state = SpacecraftState::load(&path)?;
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn current(&self) -> Result<SpacecraftState> {
        let guard = self.state.lock().map_err(|_| VyuhaError::LedgerPoisoned)?;
        Ok(guard.clone())
    }

    pub fn apply(
        &self,
        cycle_id: Uuid,
        risk: &RiskAssessment,
        command: &ProposedCommand,
    ) -> Result<AppliedManeuver> {
        let mut guard = self.state.lock().map_err(|_| VyuhaError::LedgerPoisoned)?;
        let mut next = guard.clone();
        let maneuver = next.apply_maneuver(cycle_id, risk, command);
        next.save(&self.path)?;
        *guard = next;
        tracing::debug!(
            cycle_id = %cycle_id,
            action = %maneuver.action,
            delta_v_ms = maneuver.delta_v_ms,
            "maneuver applied"
        );
        Ok(maneuver)
    }

    pub fn restore(&self) -> Result<RestoreOutcome> {
        let mut guard = self.state.lock().map_err(|_| VyuhaError::LedgerPoisoned)?;
        let mut next = guard.clone();
        if !next.restore_baseline() {
            return Ok(RestoreOutcome {
                state: next,
                changed: false,
            });
        }
        next.save(&self.path)?;
        *guard = next.clone();
        tracing::debug!("trajectory restored to baseline");
        Ok(RestoreOutcome {
            state: next,
            changed: true,
        })
    }
}
