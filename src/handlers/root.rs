//! Landing page linking to the metrics endpoint.

use axum::{extract::State, response::Html};

use crate::state::SharedState;

pub async fn root_handler(State(state): State<SharedState>) -> Html<String> {
    let metrics_path = state.config.metrics_path();
    Html(format!(
        "<html>\n\
         <head><title>Package Metrics</title></head>\n\
         <body>\n\
         <h1>Package Exporter</h1>\n\
         <p><a href='{metrics_path}'>Metrics</a></p>\n\
         </body>\n\
         </html>\n"
    ))
}
