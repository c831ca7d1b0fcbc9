//! WebAssembly module for the Garment Production Ledger
//!
//! Provides client-side checks for:
//! - Previewing a worker assignment before it is submitted
//! - Sendable quantities for the advance dialog
//! - Per-card conservation lines
//! - Route and sub-batch status validation
//!
//! Cards cross the boundary as JSON in the same shape the API returns.

use shared::ledger::{accountant, can_transition, ConservationLine};
use shared::{validate_department_route, ProductionCard, SubBatchStatus};
use uuid::Uuid;
use wasm_bindgen::prelude::*;

fn parse_card(card_json: &str) -> Result<ProductionCard, String> {
    serde_json::from_str(card_json).map_err(|e| format!("Invalid card JSON: {}", e))
}

fn to_js(message: String) -> JsValue {
    JsValue::from_str(&message)
}

fn preview_assignment_inner(card_json: &str, quantity: i32) -> Result<String, String> {
    let mut card = parse_card(card_json)?;
    accountant::reserve(&mut card, quantity).map_err(|e| e.to_string())?;
    card.tag = card.tag.on_assignment();
    serde_json::to_string(&card).map_err(|e| e.to_string())
}

fn conservation_line_inner(card_json: &str, quantity_sent: Option<i32>) -> Result<String, String> {
    let card = parse_card(card_json)?;
    serde_json::to_string(&ConservationLine::from_card(&card, quantity_sent))
        .map_err(|e| e.to_string())
}

fn validate_route_inner(department_ids_json: &str) -> Result<(), String> {
    let ids: Vec<Uuid> = serde_json::from_str(department_ids_json)
        .map_err(|e| format!("Invalid department list: {}", e))?;
    validate_department_route(&ids).map_err(str::to_string)
}

/// Card as it would look after assigning `quantity` pieces to a worker
#[wasm_bindgen]
pub fn preview_assignment(card_json: &str, quantity: i32) -> Result<String, JsValue> {
    preview_assignment_inner(card_json, quantity).map_err(to_js)
}

/// Largest quantity that may be advanced from the card
#[wasm_bindgen]
pub fn sendable_quantity(card_json: &str) -> Result<i32, JsValue> {
    parse_card(card_json)
        .map(|card| card.sendable_quantity())
        .map_err(to_js)
}

#[wasm_bindgen]
pub fn conservation_line(card_json: &str, quantity_sent: Option<i32>) -> Result<String, JsValue> {
    conservation_line_inner(card_json, quantity_sent).map_err(to_js)
}

/// Board label for the card's tag
#[wasm_bindgen]
pub fn card_tag_label(card_json: &str) -> Result<String, JsValue> {
    parse_card(card_json)
        .map(|card| card.tag.label().to_string())
        .map_err(to_js)
}

#[wasm_bindgen]
pub fn validate_route(department_ids_json: &str) -> Result<(), JsValue> {
    validate_route_inner(department_ids_json).map_err(to_js)
}

/// Whether a sub-batch may be moved between two statuses, e.g. `IN_PRODUCTION` to `COMPLETED`
#[wasm_bindgen]
pub fn can_transition_sub_batch(from: &str, to: &str) -> bool {
    match (SubBatchStatus::parse(from), SubBatchStatus::parse(to)) {
        (Some(from), Some(to)) => can_transition(from, to),
        _ => false,
    }
}
