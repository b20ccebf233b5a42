use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::{GameEntity, GameStatus, TeamEntity},
    dto::validation::validate_access_code,
};

/// Payload validating a team access code before the realtime join.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    /// Code printed on the team's join material.
    pub access_code: String,
}

impl Validate for JoinRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_access_code(&self.access_code) {
            errors.add("access_code", e);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Team portion of a successful join lookup.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamJoinInfo {
    /// Team identifier to pass to `participant:join`.
    pub id: Uuid,
    /// Team display name.
    pub name: String,
    /// Game the team plays in.
    pub game_id: Uuid,
}

impl From<&TeamEntity> for TeamJoinInfo {
    fn from(entity: &TeamEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name.clone(),
            game_id: entity.game_id,
        }
    }
}

/// Game portion of a successful join lookup.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameJoinInfo {
    /// Game identifier.
    pub id: Uuid,
    /// Game display name.
    pub name: String,
    /// Current lifecycle status (clients show a waiting screen until
    /// active).
    pub status: GameStatus,
}

impl From<&GameEntity> for GameJoinInfo {
    fn from(entity: &GameEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name.clone(),
            status: entity.status,
        }
    }
}

/// Response of the join lookup endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct JoinResponse {
    /// Team resolved from the access code.
    pub team: TeamJoinInfo,
    /// Game that team plays in.
    pub game: GameJoinInfo,
}
