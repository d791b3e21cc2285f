//! Cart and order history persistence across sessions.

use aisle_commerce::storage::{CART_STORAGE_KEY, KeyValueStore};
use aisle_commerce::{Cart, Session};
use aisle_core::{AddressPreset, ProductId};
use aisle_integration_tests::{TestDir, advance_to_summary, open_session};

// ============================================================================
// Round Trips
// ============================================================================

#[test]
fn test_three_line_cart_survives_restart() {
    let dir = TestDir::new("cart-restart");
    let original = {
        let mut session = open_session(&dir);
        session.add_to_cart(&ProductId::new("1"), 1).expect("Failed to add laptop");
        session.add_to_cart(&ProductId::new("3"), 2).expect("Failed to add phone");
        session.add_to_cart(&ProductId::new("5"), 4).expect("Failed to add plug");
        session.cart().snapshot()
    };

    let restored = open_session(&dir);
    assert_eq!(restored.cart().cart(), &original);
    assert_eq!(restored.cart().lines().len(), 3);
    assert_eq!(restored.quote().subtotal, original.subtotal());
}

#[test]
fn test_serialized_cart_round_trips_field_for_field() {
    let dir = TestDir::new("cart-serde");
    let mut session = open_session(&dir);
    session.add_to_cart(&ProductId::new("1"), 1).expect("Failed to add laptop");
    session.add_to_cart(&ProductId::new("2"), 3).expect("Failed to add tv");
    session.add_to_cart(&ProductId::new("6"), 2).expect("Failed to add speaker");

    let json = serde_json::to_string(session.cart().cart()).expect("Failed to serialize cart");
    let decoded: Cart = serde_json::from_str(&json).expect("Failed to deserialize cart");
    assert_eq!(&decoded, session.cart().cart());
}

#[test]
fn test_cart_slot_embeds_full_products() {
    let dir = TestDir::new("cart-embed");
    let mut session = open_session(&dir);
    session.add_to_cart(&ProductId::new("4"), 1).expect("Failed to add console");

    let raw = dir
        .store()
        .get(CART_STORAGE_KEY)
        .expect("Failed to read slot")
        .expect("Cart slot missing");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("Slot is not JSON");
    let line = value
        .as_array()
        .and_then(|lines| lines.first())
        .expect("Expected one line");
    assert_eq!(line["product"]["name"], "GameBox Series Z");
    assert_eq!(line["product"]["category"], "Gaming Consoles");
    assert_eq!(line["quantity"], 1);
}

#[test]
fn test_corrupt_slot_starts_empty_and_recovers() {
    let dir = TestDir::new("cart-corrupt");
    dir.store()
        .set(CART_STORAGE_KEY, "{ definitely not a cart")
        .expect("Failed to write corrupt slot");

    let mut session = open_session(&dir);
    assert!(session.cart().is_empty());

    session.add_to_cart(&ProductId::new("5"), 1).expect("Failed to add plug");
    let reopened = open_session(&dir);
    assert_eq!(reopened.cart().lines().len(), 1);
}

// ============================================================================
// Order History
// ============================================================================

#[test]
fn test_placed_orders_survive_restart_and_cart_stays_clear() {
    let dir = TestDir::new("orders-restart");
    let number = {
        let mut session = open_session(&dir);
        session.add_to_cart(&ProductId::new("2"), 1).expect("Failed to add tv");
        advance_to_summary(&mut session, AddressPreset::Work);
        session.place_order().expect("Failed to place order").number().clone()
    };

    let session: Session = open_session(&dir);
    assert!(session.cart().is_empty());
    let order = session.history().get(&number).expect("Order missing from history");
    assert_eq!(order.shipping_address().city, "Corporate City");
    assert_eq!(order.items().lines().len(), 1);
}
