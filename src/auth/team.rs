//! Choosing the team a sign-in is bound to.

use super::{SigninError, Team};
use crate::prompt::Prompter;

/// Pick exactly one team.
///
/// A single membership is selected without interaction. Several memberships
/// are listed 1-indexed and the operator enters a number; anything that does
/// not name a listed team fails the sign-in rather than re-prompting.
pub fn resolve_team(teams: &[Team], prompter: &mut dyn Prompter) -> Result<Team, SigninError> {
    let team = match teams {
        [] => return Err(SigninError::NoTeamsAvailable),
        [only] => only.clone(),
        _ => {
            let answer = prompter
                .ask(&selection_prompt(teams))
                .map_err(SigninError::Prompt)?;
            select(teams, &answer)?
        }
    };

    if team.id.is_empty() {
        return Err(SigninError::InvalidTeamSelection(team.name));
    }

    tracing::debug!(team_id = %team.id, role = %team.role, "Team resolved");
    Ok(team)
}

fn selection_prompt(teams: &[Team]) -> String {
    let mut prompt =
        String::from("Enter the number of the team you would like to use for this session.\n");
    for (index, team) in teams.iter().enumerate() {
        prompt.push_str(&format!("{}: {} ({})\n", index + 1, team.name, team.role));
    }
    prompt.push_str("Team number");
    prompt
}

fn select(teams: &[Team], answer: &str) -> Result<Team, SigninError> {
    answer
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| teams.get(index))
        .cloned()
        .ok_or_else(|| SigninError::InvalidTeamSelection(answer.to_string()))
}
