//! Read-only lookups for the participant join flow.

use crate::{
    dto::participant::{GameJoinInfo, JoinRequest, JoinResponse, TeamJoinInfo},
    error::ServiceError,
    state::SharedState,
};

/// Resolve an access code into the team and game a participant is about to
/// join. The realtime `participant:join` happens afterwards over the
/// socket.
pub async fn lookup_join(
    state: &SharedState,
    request: JoinRequest,
) -> Result<JoinResponse, ServiceError> {
    let store = state.require_quiz_store().await?;

    let team = store
        .find_team_by_access_code(request.access_code)
        .await?
        .ok_or_else(|| ServiceError::NotFound("invalid access code".into()))?;

    let game = store
        .find_game(team.game_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{}` not found", team.game_id)))?;

    Ok(JoinResponse {
        team: TeamJoinInfo::from(&team),
        game: GameJoinInfo::from(&game),
    })
}
