//! Browser tests, run with `wasm-pack test --headless --chrome`
#![cfg(target_arch = "wasm32")]

use qr_inventory_wasm::QrInventoryEngine;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn engine() -> QrInventoryEngine {
    QrInventoryEngine::new(JsValue::UNDEFINED).unwrap()
}

#[wasm_bindgen_test]
fn test_empty_engine_view() {
    let engine = engine();
    let view = engine.view().unwrap();
    let total = js_sys::Reflect::get(&view, &JsValue::from_str("totalItems")).unwrap();
    assert_eq!(total.as_f64(), Some(0.0));
}

#[wasm_bindgen_test]
fn test_print_without_items_queues_notice() {
    let engine = engine();
    let pages: js_sys::Array = engine.print_pages().unwrap().into();
    assert_eq!(pages.length(), 0);

    let notices: js_sys::Array = engine.take_notices().unwrap().into();
    assert_eq!(notices.length(), 1);
}

#[wasm_bindgen_test]
fn test_unknown_folder_is_an_error() {
    let engine = engine();
    assert!(engine.enter_folder(Some("missing".into())).is_err());
}

#[wasm_bindgen_test]
fn test_dispose_is_idempotent() {
    let mut engine = engine();
    engine.dispose();
    engine.dispose();
    assert!(!engine.dismiss_context_menu());
}
