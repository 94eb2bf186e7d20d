//! Purchase intents and their builder.
//!
//! A [`PaymentRequest`] is what the checkout flow hands the client: one per
//! checkout attempt, consumed by a single create call. The builder never
//! validates; that happens in [`super::verification`] right before signing,
//! so an invalid request is representable and rejected without any network
//! traffic.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::Currency;

// ---------------------------------------------------------------------------
// Customer & LineItem
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl Customer {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: None,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

/// One line of the order. Prices are per unit, in the request currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub quantity: u32,
    pub price: Decimal,
}

impl LineItem {
    pub fn new(name: impl Into<String>, quantity: u32, price: Decimal) -> Self {
        Self {
            name: name.into(),
            quantity,
            price,
        }
    }
}

// ---------------------------------------------------------------------------
// PaymentRequest
// ---------------------------------------------------------------------------

/// A purchase intent for a single checkout attempt.
///
/// `order_id` must be unique per merchant. Retrying a failed create means a
/// new request with a new order id; the client never resubmits on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub amount: Decimal,
    pub currency: Currency,
    pub order_id: String,
    /// May be empty; an empty description is not transmitted.
    pub description: String,
    pub return_url: Option<String>,
    pub cancel_url: Option<String>,
    pub customer: Customer,
    pub items: Vec<LineItem>,
    /// Preferred payment method (`cards`, `abapay`, ...). The gateway picks
    /// when absent.
    pub payment_option: Option<String>,
}

/// Wire shape of one line item inside the encoded `items` field.
#[derive(Serialize)]
struct EncodedItem<'a> {
    name: &'a str,
    quantity: u32,
    price: String,
}

impl PaymentRequest {
    /// Line items as the single scalar the gateway signs: base64 of the JSON
    /// array `[{"name","quantity","price"}]`, prices at the currency's
    /// fixed precision. `None` when the order has no items.
    pub fn encoded_items(&self) -> Option<String> {
        if self.items.is_empty() {
            return None;
        }
        let items: Vec<EncodedItem<'_>> = self
            .items
            .iter()
            .map(|item| EncodedItem {
                name: item.name.trim(),
                quantity: item.quantity,
                price: self.currency.format_amount(item.price),
            })
            .collect();
        // A Vec of plain structs with string/integer fields always serializes.
        let json = serde_json::to_vec(&items).unwrap_or_default();
        Some(STANDARD.encode(json))
    }

}

// ---------------------------------------------------------------------------
// PaymentRequestBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`PaymentRequest`].
///
/// ```rust
/// use paygate_client::transaction::{Currency, Customer, LineItem, PaymentRequestBuilder};
/// use rust_decimal::Decimal;
///
/// let request = PaymentRequestBuilder::new(Decimal::new(2500, 2), Currency::USD, "ORD-1001")
///     .customer(Customer::new("Jane Doe", "jane@example.com"))
///     .item(LineItem::new("Widget", 1, Decimal::new(2500, 2)))
///     .return_url("https://shop.example.com/checkout/done")
///     .build();
/// assert_eq!(request.items.len(), 1);
/// ```
pub struct PaymentRequestBuilder {
    amount: Decimal,
    currency: Currency,
    order_id: String,
    description: String,
    return_url: Option<String>,
    cancel_url: Option<String>,
    customer: Customer,
    items: Vec<LineItem>,
    payment_option: Option<String>,
}

impl PaymentRequestBuilder {
    pub fn new(amount: Decimal, currency: Currency, order_id: impl Into<String>) -> Self {
        Self {
            amount,
            currency,
            order_id: order_id.into(),
            description: String::new(),
            return_url: None,
            cancel_url: None,
            customer: Customer::new("", ""),
            items: Vec::new(),
            payment_option: None,
        }
    }

    pub fn amount(mut self, amount: Decimal) -> Self {
        self.amount = amount;
        self
    }

    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = order_id.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn return_url(mut self, url: impl Into<String>) -> Self {
        self.return_url = Some(url.into());
        self
    }

    pub fn cancel_url(mut self, url: impl Into<String>) -> Self {
        self.cancel_url = Some(url.into());
        self
    }

    pub fn customer(mut self, customer: Customer) -> Self {
        self.customer = customer;
        self
    }

    /// Appends a line item.
    pub fn item(mut self, item: LineItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn payment_option(mut self, option: impl Into<String>) -> Self {
        self.payment_option = Some(option.into());
        self
    }

    pub fn build(self) -> PaymentRequest {
        PaymentRequest {
            amount: self.amount,
            currency: self.currency,
            order_id: self.order_id,
            description: self.description,
            return_url: self.return_url,
            cancel_url: self.cancel_url,
            customer: self.customer,
            items: self.items,
            payment_option: self.payment_option,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PaymentRequest {
        PaymentRequestBuilder::new(Decimal::new(3500, 2), Currency::USD, "ORD-7")
            .customer(Customer::new("Jane Doe", "jane@example.com").with_phone("+85512345678"))
            .item(LineItem::new("Widget", 1, Decimal::new(25, 0)))
            .item(LineItem::new("Bolt", 4, Decimal::new(250, 2)))
            .build()
    }

    #[test]
    fn builder_defaults() {
        let req = PaymentRequestBuilder::new(Decimal::ONE, Currency::EUR, "A1").build();
        assert!(req.description.is_empty());
        assert!(req.items.is_empty());
        assert!(req.return_url.is_none());
        assert!(req.payment_option.is_none());
        assert_eq!(req.encoded_items(), None);
    }

    #[test]
    fn encoded_items_use_fixed_precision() {
        let encoded = sample().encoded_items().unwrap();
        let json = STANDARD.decode(encoded).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(value[0]["name"], "Widget");
        assert_eq!(value[0]["quantity"], 1);
        assert_eq!(value[0]["price"], "25.00");
        assert_eq!(value[1]["price"], "2.50");
    }

    #[test]
    fn encoded_items_are_stable() {
        assert_eq!(sample().encoded_items(), sample().encoded_items());
    }
}
