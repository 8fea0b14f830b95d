use utoipa_axum::{router::OpenApiRouter, routes};

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/contests", contest_routes())
        .nest("/problems", problem_routes())
        .nest("/submissions", submission_routes())
}

fn contest_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::contest::list_contests,
            handlers::contest::create_contest,
        ))
        .routes(routes!(handlers::contest::create_contest_with_problems))
        .routes(routes!(handlers::contest::get_contest))
        .routes(routes!(handlers::contest::stop_contest))
        .routes(routes!(handlers::leaderboard::get_leaderboard))
        .routes(routes!(handlers::leaderboard::stream_leaderboard))
}

fn problem_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::problem::list_problems,
            handlers::problem::create_problem,
        ))
        .routes(routes!(
            handlers::problem::get_problem,
            handlers::problem::delete_problem,
        ))
}

fn submission_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(
        handlers::submission::list_submissions,
        handlers::submission::submit_solution,
    ))
}
