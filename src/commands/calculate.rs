//! Calculate relay command

use serde_json::Value as JsonValue;
use tauri::State;

use crate::backend::CalculateRequest;
use crate::state::AppState;
use crate::Result;

/// Forward a formula evaluation to the backend and return its JSON reply
#[tauri::command]
pub async fn calculate(
    state: State<'_, AppState>,
    formula: String,
    params: JsonValue,
    vals: JsonValue,
) -> Result<JsonValue> {
    let request = CalculateRequest {
        formula,
        params,
        vals,
    };

    state.client.calculate(&request).await
}
