use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use super::{
    catalog::{CatalogEntry, ProductRef},
    discount::{DiscountRule, PricingError},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("cart is already checked out")]
    CartClosed,

    #[error("{0} is not in the cart")]
    ItemNotFound(ProductRef),

    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// One product in a cart, priced at the moment it was added.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub entry: Arc<CatalogEntry>,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl LineItem {
    pub fn new(entry: Arc<CatalogEntry>, unit_price: Decimal, quantity: i32) -> Self {
        Self {
            entry,
            quantity,
            unit_price,
        }
    }

    pub fn product_ref(&self) -> ProductRef {
        self.entry.product_ref()
    }

    /// Total for the line under the entry's discount rule.
    ///
    /// A package deal of `n` takes one unit price off per complete bundle of
    /// `n`, whatever the number of paid units in the deal label.
    pub fn line_total(&self) -> Result<Decimal, PricingError> {
        if self.quantity <= 0 {
            return Err(PricingError::InvalidQuantity(self.quantity));
        }
        let quantity = Decimal::from(self.quantity);

        let total = match self.entry.discount_rule()? {
            rule @ DiscountRule::Percentage { .. } => quantity * rule.unit_price(self.unit_price),
            DiscountRule::PackageDeal { bundle } => {
                let bundle = i32::try_from(bundle).unwrap_or(i32::MAX);
                let bundles = Decimal::from(self.quantity / bundle);
                quantity * self.unit_price - bundles * self.unit_price
            }
            DiscountRule::NoDiscount => quantity * self.unit_price,
        };
        Ok(total)
    }
}

/// A user's cart. Once checked out it no longer accepts changes.
#[derive(Debug, Clone)]
pub struct Cart {
    id: Uuid,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    checked_out: bool,
    items: Vec<LineItem>,
}

impl Cart {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            created_at: Utc::now(),
            checked_out: false,
            items: Vec::new(),
        }
    }

    /// Rebuilds a cart from stored state, keeping the given line order.
    pub fn from_parts(
        id: Uuid,
        user_id: Uuid,
        created_at: DateTime<Utc>,
        checked_out: bool,
        items: Vec<LineItem>,
    ) -> Self {
        Self {
            id,
            user_id,
            created_at,
            checked_out,
            items,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_checked_out(&self) -> bool {
        self.checked_out
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|item| i64::from(item.quantity)).sum()
    }

    /// Adds `quantity` units of `entry`. A product already in the cart keeps
    /// its original unit price and only grows in quantity.
    pub fn add(
        &mut self,
        entry: Arc<CatalogEntry>,
        unit_price: Decimal,
        quantity: i32,
    ) -> Result<&LineItem, CartError> {
        self.ensure_open()?;
        if quantity <= 0 {
            return Err(PricingError::InvalidQuantity(quantity).into());
        }

        let product = entry.product_ref();
        let index = match self.position(&product) {
            Some(index) => {
                let item = &mut self.items[index];
                item.quantity = item
                    .quantity
                    .checked_add(quantity)
                    .ok_or(PricingError::InvalidQuantity(quantity))?;
                index
            }
            None => {
                self.items.push(LineItem::new(entry, unit_price, quantity));
                self.items.len() - 1
            }
        };
        Ok(&self.items[index])
    }

    pub fn remove(&mut self, product: &ProductRef) -> Result<LineItem, CartError> {
        self.ensure_open()?;
        let index = self
            .position(product)
            .ok_or(CartError::ItemNotFound(*product))?;
        Ok(self.items.remove(index))
    }

    pub fn grand_total(&self) -> Result<Decimal, PricingError> {
        self.items
            .iter()
            .try_fold(Decimal::ZERO, |total, item| Ok(total + item.line_total()?))
    }

    /// Closes the cart. Returns `false` if it was already checked out.
    pub fn checkout(&mut self) -> bool {
        if self.checked_out {
            return false;
        }
        self.checked_out = true;
        true
    }

    fn ensure_open(&self) -> Result<(), CartError> {
        if self.checked_out {
            return Err(CartError::CartClosed);
        }
        Ok(())
    }

    fn position(&self, product: &ProductRef) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.product_ref() == *product)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::{catalog::entry, discount::DiscountCode};

    fn line(price: Decimal, code: DiscountCode, quantity: i32) -> LineItem {
        let product = Arc::new(entry("Widget", price, code));
        LineItem::new(product, price, quantity)
    }

    #[test]
    fn percentage_line_total() {
        let item = line(dec!(100.00), DiscountCode::FiftyPercent, 3);
        assert_eq!(item.line_total(), Ok(dec!(150.00)));
    }

    #[test]
    fn package_line_total() {
        let item = line(dec!(10.00), DiscountCode::ThreeForTwo, 6);
        assert_eq!(item.line_total(), Ok(dec!(40.00)));

        let item = line(dec!(10.00), DiscountCode::ThreeForTwo, 2);
        assert_eq!(item.line_total(), Ok(dec!(20.00)));
    }

    #[test]
    fn package_total_is_monotonic() {
        let price = dec!(7.25);
        for code in [DiscountCode::ThreeForTwo, DiscountCode::TwoForOne] {
            let bundle = match code.rule() {
                Ok(DiscountRule::PackageDeal { bundle }) => bundle as i32,
                other => panic!("unexpected rule {other:?}"),
            };
            let mut previous = Decimal::ZERO;
            for quantity in 1..=30 {
                let total = line(price, code, quantity).line_total().unwrap();
                let later = line(price, code, quantity + bundle).line_total().unwrap();
                assert!(total >= previous, "not monotonic at {quantity}");
                // one more bundle adds `bundle` units and takes one unit back off
                assert_eq!(later - total, Decimal::from(bundle - 1) * price);
                previous = total;
            }
        }
    }

    #[test]
    fn two_for_one_adds_one_unit_per_bundle() {
        let price = dec!(3.00);
        for quantity in 1..=20 {
            let total = line(price, DiscountCode::TwoForOne, quantity).line_total().unwrap();
            let later = line(price, DiscountCode::TwoForOne, quantity + 2).line_total().unwrap();
            assert_eq!(total, later - price);
        }
    }

    #[test]
    fn no_discount_is_plain_multiplication() {
        for quantity in 1..=12 {
            let item = line(dec!(3.33), DiscountCode::NoDiscount, quantity);
            assert_eq!(item.line_total(), Ok(Decimal::from(quantity) * dec!(3.33)));
        }
    }

    #[test]
    fn line_total_uses_snapshot_price() {
        let product = Arc::new(entry("Widget", dec!(20.00), DiscountCode::NoDiscount));
        let item = LineItem::new(product, dec!(15.00), 2);
        assert_eq!(item.line_total(), Ok(dec!(30.00)));
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        for quantity in [0, -1] {
            let item = line(dec!(1.00), DiscountCode::NoDiscount, quantity);
            assert_eq!(item.line_total(), Err(PricingError::InvalidQuantity(quantity)));
        }
    }

    #[test]
    fn empty_cart_totals_zero() {
        let cart = Cart::new(Uuid::new_v4());
        assert_eq!(cart.grand_total(), Ok(Decimal::ZERO));
        assert_eq!(cart.item_count(), 0);
    }

    #[test]
    fn adding_same_entry_grows_quantity() {
        let mut cart = Cart::new(Uuid::new_v4());
        let product = Arc::new(entry("Widget", dec!(4.00), DiscountCode::NoDiscount));

        cart.add(Arc::clone(&product), dec!(4.00), 1).unwrap();
        let item = cart.add(Arc::clone(&product), dec!(5.00), 2).unwrap();

        assert_eq!(item.quantity, 3);
        assert_eq!(item.unit_price, dec!(4.00));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.grand_total(), Ok(dec!(12.00)));
    }

    #[test]
    fn growing_past_max_quantity_is_rejected() {
        let mut cart = Cart::new(Uuid::new_v4());
        let product = Arc::new(entry("Widget", dec!(1.00), DiscountCode::NoDiscount));

        cart.add(Arc::clone(&product), dec!(1.00), i32::MAX).unwrap();
        let overflow = cart.add(Arc::clone(&product), dec!(1.00), 5);

        assert_eq!(
            overflow.err(),
            Some(CartError::Pricing(PricingError::InvalidQuantity(5)))
        );
        assert_eq!(cart.items()[0].quantity, i32::MAX);
    }

    #[test]
    fn grand_total_ignores_insertion_order() {
        let lamp = Arc::new(entry("Lamp", dec!(100.00), DiscountCode::FiftyPercent));
        let candle = Arc::new(entry("Candle", dec!(10.00), DiscountCode::ThreeForTwo));
        let vase = Arc::new(entry("Vase", dec!(2.50), DiscountCode::NoDiscount));

        let mut forward = Cart::new(Uuid::new_v4());
        forward.add(Arc::clone(&lamp), lamp.price, 3).unwrap();
        forward.add(Arc::clone(&candle), candle.price, 6).unwrap();
        forward.add(Arc::clone(&vase), vase.price, 4).unwrap();

        let mut reverse = Cart::new(Uuid::new_v4());
        reverse.add(Arc::clone(&vase), vase.price, 4).unwrap();
        reverse.add(Arc::clone(&candle), candle.price, 6).unwrap();
        reverse.add(Arc::clone(&lamp), lamp.price, 3).unwrap();

        let expected = dec!(150.00) + dec!(40.00) + dec!(10.00);
        assert_eq!(forward.grand_total(), Ok(expected));
        assert_eq!(reverse.grand_total(), Ok(expected));
        assert_eq!(forward.item_count(), 13);
    }

    #[test]
    fn remove_missing_entry_fails() {
        let mut cart = Cart::new(Uuid::new_v4());
        let missing = ProductRef::product(Uuid::new_v4());
        assert_eq!(cart.remove(&missing), Err(CartError::ItemNotFound(missing)));
    }

    #[test]
    fn remove_keeps_remaining_order() {
        let mut cart = Cart::new(Uuid::new_v4());
        let names = ["A", "B", "C"];
        let products: Vec<_> = names
            .iter()
            .map(|name| Arc::new(entry(name, dec!(1.00), DiscountCode::NoDiscount)))
            .collect();
        for product in &products {
            cart.add(Arc::clone(product), dec!(1.00), 1).unwrap();
        }

        let removed = cart.remove(&products[1].product_ref()).unwrap();
        assert_eq!(removed.entry.name, "B");
        let remaining: Vec<_> = cart.items().iter().map(|i| i.entry.name.as_str()).collect();
        assert_eq!(remaining, ["A", "C"]);
    }

    #[test]
    fn checked_out_cart_is_frozen() {
        let mut cart = Cart::new(Uuid::new_v4());
        let product = Arc::new(entry("Widget", dec!(1.00), DiscountCode::NoDiscount));
        cart.add(Arc::clone(&product), dec!(1.00), 1).unwrap();

        assert!(cart.checkout());
        assert!(!cart.checkout());
        assert!(cart.is_checked_out());

        assert_eq!(
            cart.add(Arc::clone(&product), dec!(1.00), 1).unwrap_err(),
            CartError::CartClosed
        );
        assert_eq!(
            cart.remove(&product.product_ref()).unwrap_err(),
            CartError::CartClosed
        );
        assert_eq!(cart.grand_total(), Ok(dec!(1.00)));
    }

    #[test]
    fn add_rejects_non_positive_quantity() {
        let mut cart = Cart::new(Uuid::new_v4());
        let product = Arc::new(entry("Widget", dec!(1.00), DiscountCode::NoDiscount));
        assert_eq!(
            cart.add(product, dec!(1.00), 0).unwrap_err(),
            CartError::Pricing(PricingError::InvalidQuantity(0))
        );
        assert!(cart.is_empty());
    }
}
