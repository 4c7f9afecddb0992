//! Four-step checkout wizard: shipping info, delivery method, payment, review.
//!
//! Forward navigation is gated on the current step's field validation;
//! backward navigation is always allowed. Failed checks land in a
//! field-keyed error map that a UI renders next to each input.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use bigdecimal::{BigDecimal, Zero};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::cart::Cart;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static CARD_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{16}$").expect("valid card number regex"));
static EXPIRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(0[1-9]|1[0-2])/[0-9]{2}$").expect("valid expiry regex"));
static CVC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{3,4}$").expect("valid cvc regex"));

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value.trim())
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutStep {
    #[default]
    ShippingInfo,
    DeliveryMethod,
    Payment,
    Review,
}

impl CheckoutStep {
    pub const ALL: [CheckoutStep; 4] = [
        CheckoutStep::ShippingInfo,
        CheckoutStep::DeliveryMethod,
        CheckoutStep::Payment,
        CheckoutStep::Review,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<CheckoutStep> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn prev(self) -> Option<CheckoutStep> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }

    pub fn title(self) -> &'static str {
        match self {
            CheckoutStep::ShippingInfo => "Shipping Information",
            CheckoutStep::DeliveryMethod => "Delivery Method",
            CheckoutStep::Payment => "Payment",
            CheckoutStep::Review => "Review Order",
        }
    }
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryOption {
    pub id: &'static str,
    pub name: &'static str,
    pub estimate: &'static str,
    price_cents: i64,
}

impl DeliveryOption {
    pub fn price(&self) -> BigDecimal {
        BigDecimal::new(self.price_cents.into(), 2)
    }
}

pub const DELIVERY_OPTIONS: [DeliveryOption; 3] = [
    DeliveryOption {
        id: "standard",
        name: "Standard Delivery",
        estimate: "5-7 business days",
        price_cents: 500,
    },
    DeliveryOption {
        id: "express",
        name: "Express Delivery",
        estimate: "2-3 business days",
        price_cents: 1500,
    },
    DeliveryOption {
        id: "overnight",
        name: "Overnight Delivery",
        estimate: "Next business day",
        price_cents: 2500,
    },
];

pub fn delivery_option(id: &str) -> Option<&'static DeliveryOption> {
    DELIVERY_OPTIONS.iter().find(|option| option.id == id)
}

/// Delivery cost for `id`; unknown or unset methods cost nothing.
pub fn delivery_cost(id: Option<&str>) -> BigDecimal {
    id.and_then(delivery_option)
        .map(DeliveryOption::price)
        .unwrap_or_else(BigDecimal::zero)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    Paypal,
    CashOnDelivery,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
        }
    }

    pub fn parse(value: &str) -> Option<PaymentMethod> {
        match value {
            "credit_card" => Some(PaymentMethod::CreditCard),
            "paypal" => Some(PaymentMethod::Paypal),
            "cash_on_delivery" => Some(PaymentMethod::CashOnDelivery),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingInfo {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardDetails {
    pub card_holder: String,
    pub card_number: String,
    pub expiry: String,
    pub cvc: String,
}

impl CardDetails {
    fn digits(&self) -> String {
        self.card_number.chars().filter(|c| !c.is_whitespace()).collect()
    }

    pub fn last_four(&self) -> Option<String> {
        let digits: Vec<char> = self.digits().chars().collect();
        (digits.len() >= 4).then(|| digits[digits.len() - 4..].iter().collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutForm {
    pub shipping: ShippingInfo,
    pub delivery_method: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub card: CardDetails,
    pub notes: String,
}

pub type FieldErrors = BTreeMap<String, String>;

fn require(errors: &mut FieldErrors, key: &str, value: &str, label: &str) -> bool {
    if value.trim().is_empty() {
        errors.insert(key.to_string(), format!("{} is required", label));
        false
    } else {
        true
    }
}

impl CheckoutForm {
    /// Field checks for `step`. An empty map means the step may be left.
    pub fn validate(&self, step: CheckoutStep) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match step {
            CheckoutStep::ShippingInfo => {
                let s = &self.shipping;
                require(&mut errors, "first_name", &s.first_name, "First name");
                require(&mut errors, "last_name", &s.last_name, "Last name");
                if require(&mut errors, "email", &s.email, "Email") && !is_valid_email(&s.email) {
                    errors.insert(
                        "email".to_string(),
                        "Please enter a valid email address".to_string(),
                    );
                }
                require(&mut errors, "phone", &s.phone, "Phone number");
                require(&mut errors, "address", &s.address, "Address");
                require(&mut errors, "city", &s.city, "City");
                require(&mut errors, "postal_code", &s.postal_code, "Postal code");
                require(&mut errors, "country", &s.country, "Country");
            }
            CheckoutStep::DeliveryMethod => {
                let known = self
                    .delivery_method
                    .as_deref()
                    .and_then(delivery_option)
                    .is_some();
                if !known {
                    errors.insert(
                        "delivery_method".to_string(),
                        "Please select a delivery method".to_string(),
                    );
                }
            }
            CheckoutStep::Payment => match self.payment_method {
                None => {
                    errors.insert(
                        "payment_method".to_string(),
                        "Please select a payment method".to_string(),
                    );
                }
                Some(PaymentMethod::CreditCard) => {
                    let c = &self.card;
                    require(&mut errors, "card_holder", &c.card_holder, "Cardholder name");
                    if require(&mut errors, "card_number", &c.card_number, "Card number")
                        && !CARD_NUMBER_RE.is_match(&c.digits())
                    {
                        errors.insert(
                            "card_number".to_string(),
                            "Card number must be 16 digits".to_string(),
                        );
                    }
                    if require(&mut errors, "expiry", &c.expiry, "Expiry date")
                        && !EXPIRY_RE.is_match(c.expiry.trim())
                    {
                        errors.insert(
                            "expiry".to_string(),
                            "Expiry date must be in MM/YY format".to_string(),
                        );
                    }
                    if require(&mut errors, "cvc", &c.cvc, "CVC") && !CVC_RE.is_match(c.cvc.trim())
                    {
                        errors.insert("cvc".to_string(), "CVC must be 3 or 4 digits".to_string());
                    }
                }
                Some(_) => {}
            },
            CheckoutStep::Review => {}
        }
        errors
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StepError {
    #[error("{step} has {} invalid field(s)", .errors.len())]
    Invalid {
        step: CheckoutStep,
        errors: FieldErrors,
    },
    #[error("cannot jump forward from {from} to {to}")]
    ForwardJump {
        from: CheckoutStep,
        to: CheckoutStep,
    },
    #[error("unknown checkout field '{0}'")]
    UnknownField(String),
    #[error("cart is empty")]
    EmptyCart,
    #[error("order is already being submitted")]
    AlreadySubmitting,
    #[error("order submission failed: {0}")]
    Submission(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderPayloadItem {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

/// Everything the wizard collected, ready to hand to the order API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderPayload {
    pub shipping: ShippingInfo,
    pub delivery_method: String,
    pub payment_method: PaymentMethod,
    pub card_last_four: Option<String>,
    pub notes: Option<String>,
    pub coupon_code: Option<String>,
    pub items: Vec<OrderPayloadItem>,
    pub subtotal: BigDecimal,
    pub delivery_cost: BigDecimal,
    pub total: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderConfirmation {
    pub order_number: Uuid,
    pub total: BigDecimal,
}

pub trait OrderSubmitter {
    fn submit(
        &self,
        payload: OrderPayload,
    ) -> impl Future<Output = Result<OrderConfirmation, String>> + Send;
}

/// Accepts every order after a fixed delay.
#[derive(Debug, Clone)]
pub struct SimulatedSubmitter {
    pub delay: Duration,
}

impl Default for SimulatedSubmitter {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1500),
        }
    }
}

impl OrderSubmitter for SimulatedSubmitter {
    async fn submit(&self, payload: OrderPayload) -> Result<OrderConfirmation, String> {
        tokio::time::sleep(self.delay).await;
        Ok(OrderConfirmation {
            order_number: Uuid::new_v4(),
            total: payload.total,
        })
    }
}

/// Holds the in-flight flag for one submission and clears it on drop, so an
/// abandoned `place_order` future does not lock the wizard.
struct InFlight<'a>(&'a mut bool);

impl<'a> InFlight<'a> {
    fn start(flag: &'a mut bool) -> Self {
        *flag = true;
        InFlight(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

#[derive(Debug, Clone, Default)]
pub struct CheckoutWizard {
    current: CheckoutStep,
    form: CheckoutForm,
    errors: FieldErrors,
    submitting: bool,
}

impl CheckoutWizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_step(&self) -> CheckoutStep {
        self.current
    }

    pub fn form(&self) -> &CheckoutForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut CheckoutForm {
        &mut self.form
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Sets a form field by its error-map key and drops any error recorded
    /// for it.
    pub fn update_field(&mut self, field: &str, value: impl Into<String>) -> Result<(), StepError> {
        let value = value.into();
        let f = &mut self.form;
        match field {
            "first_name" => f.shipping.first_name = value,
            "last_name" => f.shipping.last_name = value,
            "email" => f.shipping.email = value,
            "phone" => f.shipping.phone = value,
            "address" => f.shipping.address = value,
            "city" => f.shipping.city = value,
            "postal_code" => f.shipping.postal_code = value,
            "country" => f.shipping.country = value,
            "delivery_method" => {
                f.delivery_method = (!value.is_empty()).then_some(value);
            }
            "payment_method" => f.payment_method = PaymentMethod::parse(&value),
            "card_holder" => f.card.card_holder = value,
            "card_number" => f.card.card_number = value,
            "expiry" => f.card.expiry = value,
            "cvc" => f.card.cvc = value,
            "notes" => f.notes = value,
            other => return Err(StepError::UnknownField(other.to_string())),
        }
        self.errors.remove(field);
        Ok(())
    }

    /// Validates the current step, replacing the error map with the outcome.
    pub fn validate_current_step(&mut self) -> bool {
        self.errors = self.form.validate(self.current);
        self.errors.is_empty()
    }

    pub fn next_step(&mut self) -> Result<CheckoutStep, StepError> {
        if !self.validate_current_step() {
            return Err(StepError::Invalid {
                step: self.current,
                errors: self.errors.clone(),
            });
        }
        if let Some(next) = self.current.next() {
            self.current = next;
        }
        Ok(self.current)
    }

    pub fn prev_step(&mut self) -> CheckoutStep {
        if let Some(prev) = self.current.prev() {
            self.current = prev;
        }
        self.errors.clear();
        self.current
    }

    pub fn go_to_step(&mut self, target: CheckoutStep) -> Result<CheckoutStep, StepError> {
        if target > self.current {
            return Err(StepError::ForwardJump {
                from: self.current,
                to: target,
            });
        }
        self.current = target;
        self.errors.clear();
        Ok(self.current)
    }

    pub fn delivery_cost(&self) -> BigDecimal {
        delivery_cost(self.form.delivery_method.as_deref())
    }

    /// Cart subtotal plus the selected delivery cost, with two decimals.
    pub fn order_total(&self, cart_subtotal: &BigDecimal) -> String {
        (cart_subtotal + self.delivery_cost())
            .with_scale(2)
            .to_string()
    }

    fn build_payload(&self, cart: &Cart) -> Result<OrderPayload, StepError> {
        let mut errors = FieldErrors::new();
        for step in CheckoutStep::ALL {
            errors.extend(self.form.validate(step));
        }
        let (Some(delivery_method), Some(payment_method), true) = (
            self.form.delivery_method.clone(),
            self.form.payment_method,
            errors.is_empty(),
        ) else {
            return Err(StepError::Invalid {
                step: self.current,
                errors,
            });
        };

        let subtotal = cart.subtotal();
        let delivery_cost = self.delivery_cost();
        let total = (&subtotal + &delivery_cost).with_scale(2);
        let notes = self.form.notes.trim();

        Ok(OrderPayload {
            shipping: self.form.shipping.clone(),
            delivery_method,
            payment_method,
            card_last_four: match payment_method {
                PaymentMethod::CreditCard => self.form.card.last_four(),
                _ => None,
            },
            notes: (!notes.is_empty()).then(|| notes.to_string()),
            coupon_code: cart.coupon_code().map(str::to_string),
            items: cart
                .items()
                .iter()
                .map(|item| OrderPayloadItem {
                    product_id: item.product_id,
                    name: item.name.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price.clone(),
                })
                .collect(),
            subtotal,
            delivery_cost,
            total,
        })
    }

    /// Re-validates the current step, submits the assembled order, and on
    /// success empties the cart and resets the wizard.
    pub async fn place_order<S: OrderSubmitter>(
        &mut self,
        cart: &mut Cart,
        submitter: &S,
    ) -> Result<OrderConfirmation, StepError> {
        if self.submitting {
            return Err(StepError::AlreadySubmitting);
        }
        if !self.validate_current_step() {
            return Err(StepError::Invalid {
                step: self.current,
                errors: self.errors.clone(),
            });
        }
        if cart.is_empty() {
            return Err(StepError::EmptyCart);
        }
        let payload = self.build_payload(cart)?;

        let outcome = {
            let _in_flight = InFlight::start(&mut self.submitting);
            submitter.submit(payload).await
        };

        let confirmation = outcome.map_err(StepError::Submission)?;
        cart.clear();
        *self = CheckoutWizard::new();
        Ok(confirmation)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::domain::cart::CartItem;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).expect("valid decimal")
    }

    fn filled_shipping(wizard: &mut CheckoutWizard) {
        for (field, value) in [
            ("first_name", "Ada"),
            ("last_name", "Lovelace"),
            ("email", "ada@example.com"),
            ("phone", "+44 20 7946 0000"),
            ("address", "12 Analytical Row"),
            ("city", "London"),
            ("postal_code", "N1 9GU"),
            ("country", "UK"),
        ] {
            wizard.update_field(field, value).unwrap();
        }
    }

    fn wizard_at_review() -> CheckoutWizard {
        let mut wizard = CheckoutWizard::new();
        filled_shipping(&mut wizard);
        wizard.next_step().unwrap();
        wizard.update_field("delivery_method", "express").unwrap();
        wizard.next_step().unwrap();
        wizard.update_field("payment_method", "credit_card").unwrap();
        wizard.update_field("card_holder", "Ada Lovelace").unwrap();
        wizard.update_field("card_number", "4242 4242 4242 4242").unwrap();
        wizard.update_field("expiry", "12/29").unwrap();
        wizard.update_field("cvc", "123").unwrap();
        wizard.next_step().unwrap();
        wizard
    }

    fn cart_with(price: &str, quantity: i32) -> Cart {
        let mut cart = Cart::new();
        cart.add_item(CartItem {
            product_id: Uuid::new_v4(),
            name: "Notebook".to_string(),
            unit_price: dec(price),
            quantity,
        })
        .unwrap();
        cart
    }

    #[test]
    fn starts_at_shipping_info() {
        assert_eq!(CheckoutWizard::new().current_step(), CheckoutStep::ShippingInfo);
    }

    #[test]
    fn empty_email_blocks_next_step() {
        let mut wizard = CheckoutWizard::new();
        filled_shipping(&mut wizard);
        wizard.update_field("email", "").unwrap();

        let err = wizard.next_step().unwrap_err();
        assert!(matches!(err, StepError::Invalid { .. }));
        assert_eq!(wizard.current_step(), CheckoutStep::ShippingInfo);
        assert_eq!(wizard.errors().get("email").unwrap(), "Email is required");
    }

    #[test]
    fn malformed_email_is_reported() {
        let mut wizard = CheckoutWizard::new();
        filled_shipping(&mut wizard);
        wizard.update_field("email", "ada-at-example").unwrap();
        assert!(wizard.next_step().is_err());
        assert_eq!(
            wizard.errors().get("email").unwrap(),
            "Please enter a valid email address"
        );
    }

    #[test]
    fn valid_shipping_advances_to_delivery() {
        let mut wizard = CheckoutWizard::new();
        filled_shipping(&mut wizard);
        assert_eq!(wizard.next_step().unwrap(), CheckoutStep::DeliveryMethod);
        assert!(wizard.errors().is_empty());
    }

    #[test]
    fn editing_a_field_clears_its_error() {
        let mut wizard = CheckoutWizard::new();
        assert!(wizard.next_step().is_err());
        assert!(wizard.errors().contains_key("city"));
        wizard.update_field("city", "Paris").unwrap();
        assert!(!wizard.errors().contains_key("city"));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let mut wizard = CheckoutWizard::new();
        assert_eq!(
            wizard.update_field("shoe_size", "9"),
            Err(StepError::UnknownField("shoe_size".to_string()))
        );
    }

    #[test]
    fn delivery_step_requires_known_method() {
        let mut wizard = CheckoutWizard::new();
        filled_shipping(&mut wizard);
        wizard.next_step().unwrap();
        wizard.update_field("delivery_method", "teleport").unwrap();
        assert!(wizard.next_step().is_err());
        assert!(wizard.errors().contains_key("delivery_method"));
    }

    #[test]
    fn card_fields_are_checked_for_credit_card() {
        let mut form = CheckoutForm {
            payment_method: Some(PaymentMethod::CreditCard),
            ..Default::default()
        };
        form.card = CardDetails {
            card_holder: "Ada".to_string(),
            card_number: "1234".to_string(),
            expiry: "13/30".to_string(),
            cvc: "12".to_string(),
        };
        let errors = form.validate(CheckoutStep::Payment);
        assert_eq!(errors.len(), 3);
        assert!(errors.contains_key("card_number"));
        assert!(errors.contains_key("expiry"));
        assert!(errors.contains_key("cvc"));
    }

    #[test]
    fn non_ascii_digits_are_not_a_card_number() {
        let form = CheckoutForm {
            payment_method: Some(PaymentMethod::CreditCard),
            card: CardDetails {
                card_holder: "Ada".to_string(),
                card_number: "42424242424242१२".to_string(),
                expiry: "١٢/٣٠".to_string(),
                cvc: "١٢٣".to_string(),
            },
            ..Default::default()
        };
        let errors = form.validate(CheckoutStep::Payment);
        assert!(errors.contains_key("card_number"));
        assert!(errors.contains_key("expiry"));
        assert!(errors.contains_key("cvc"));
    }

    #[test]
    fn last_four_counts_characters_not_bytes() {
        let card = CardDetails {
            card_number: "42424242424242१२".to_string(),
            ..Default::default()
        };
        assert_eq!(card.last_four().as_deref(), Some("42१२"));
    }

    #[test]
    fn paypal_needs_no_card_fields() {
        let form = CheckoutForm {
            payment_method: Some(PaymentMethod::Paypal),
            ..Default::default()
        };
        assert!(form.validate(CheckoutStep::Payment).is_empty());
    }

    #[test]
    fn forward_jump_is_rejected() {
        let mut wizard = CheckoutWizard::new();
        let err = wizard.go_to_step(CheckoutStep::Payment).unwrap_err();
        assert_eq!(
            err,
            StepError::ForwardJump {
                from: CheckoutStep::ShippingInfo,
                to: CheckoutStep::Payment
            }
        );
        assert_eq!(wizard.current_step(), CheckoutStep::ShippingInfo);
    }

    #[test]
    fn backward_jump_is_allowed() {
        let mut wizard = wizard_at_review();
        assert_eq!(
            wizard.go_to_step(CheckoutStep::DeliveryMethod).unwrap(),
            CheckoutStep::DeliveryMethod
        );
        assert_eq!(
            wizard.go_to_step(CheckoutStep::DeliveryMethod).unwrap(),
            CheckoutStep::DeliveryMethod
        );
    }

    #[test]
    fn prev_step_saturates_at_first_step() {
        let mut wizard = CheckoutWizard::new();
        assert_eq!(wizard.prev_step(), CheckoutStep::ShippingInfo);

        let mut wizard = wizard_at_review();
        assert_eq!(wizard.prev_step(), CheckoutStep::Payment);
        assert_eq!(wizard.prev_step(), CheckoutStep::DeliveryMethod);
    }

    #[test]
    fn next_step_stays_on_review() {
        let mut wizard = wizard_at_review();
        assert_eq!(wizard.next_step().unwrap(), CheckoutStep::Review);
    }

    #[test]
    fn express_total_adds_fifteen() {
        let mut wizard = CheckoutWizard::new();
        wizard.update_field("delivery_method", "express").unwrap();
        assert_eq!(wizard.order_total(&dec("42.00")), "57.00");
    }

    #[test]
    fn unset_delivery_costs_nothing() {
        let wizard = CheckoutWizard::new();
        assert_eq!(wizard.order_total(&dec("42")), "42.00");
    }

    #[test]
    fn last_four_strips_spaces() {
        let card = CardDetails {
            card_number: "4242 4242 4242 1234".to_string(),
            ..Default::default()
        };
        assert_eq!(card.last_four().as_deref(), Some("1234"));
    }

    #[tokio::test]
    async fn place_order_submits_payload_and_resets() {
        let mut wizard = wizard_at_review();
        let mut cart = cart_with("21.00", 2);
        let submitter = SimulatedSubmitter {
            delay: Duration::from_millis(1),
        };

        let confirmation = wizard.place_order(&mut cart, &submitter).await.unwrap();

        assert_eq!(confirmation.total, dec("57.00"));
        assert!(cart.is_empty());
        assert_eq!(wizard.current_step(), CheckoutStep::ShippingInfo);
        assert_eq!(wizard.form(), &CheckoutForm::default());
        assert!(!wizard.is_submitting());
    }

    #[tokio::test]
    async fn place_order_with_empty_cart_fails() {
        let mut wizard = wizard_at_review();
        let mut cart = Cart::new();
        let err = wizard
            .place_order(&mut cart, &SimulatedSubmitter::default())
            .await
            .unwrap_err();
        assert_eq!(err, StepError::EmptyCart);
    }

    struct RejectingSubmitter;

    impl OrderSubmitter for RejectingSubmitter {
        async fn submit(&self, _payload: OrderPayload) -> Result<OrderConfirmation, String> {
            Err("payment declined".to_string())
        }
    }

    #[tokio::test]
    async fn failed_submission_keeps_form_and_cart() {
        let mut wizard = wizard_at_review();
        let mut cart = cart_with("10.00", 1);

        let err = wizard
            .place_order(&mut cart, &RejectingSubmitter)
            .await
            .unwrap_err();

        assert_eq!(err, StepError::Submission("payment declined".to_string()));
        assert_eq!(wizard.current_step(), CheckoutStep::Review);
        assert!(!cart.is_empty());
        assert!(!wizard.is_submitting());
    }

    struct StalledSubmitter;

    impl OrderSubmitter for StalledSubmitter {
        async fn submit(&self, _payload: OrderPayload) -> Result<OrderConfirmation, String> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn abandoned_submission_releases_the_wizard() {
        let mut wizard = wizard_at_review();
        let mut cart = cart_with("10.00", 1);

        let attempt = tokio::time::timeout(
            Duration::from_millis(5),
            wizard.place_order(&mut cart, &StalledSubmitter),
        )
        .await;
        assert!(attempt.is_err());
        assert!(!wizard.is_submitting());

        let submitter = SimulatedSubmitter {
            delay: Duration::from_millis(1),
        };
        assert!(wizard.place_order(&mut cart, &submitter).await.is_ok());
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn place_order_revalidates_current_step() {
        let mut wizard = CheckoutWizard::new();
        let mut cart = cart_with("10.00", 1);
        let err = wizard
            .place_order(&mut cart, &SimulatedSubmitter::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StepError::Invalid {
                step: CheckoutStep::ShippingInfo,
                ..
            }
        ));
        assert!(wizard.errors().contains_key("email"));
    }
}
