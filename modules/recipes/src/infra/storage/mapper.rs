use rust_decimal::Decimal;

use crate::contract::model::{Token, User};
use crate::infra::storage::entity::{token, user};

impl From<user::Model> for User {
    fn from(e: user::Model) -> Self {
        Self {
            id: e.id,
            email: e.email,
            name: e.name,
            password_hash: e.password,
            is_active: e.is_active,
            is_staff: e.is_staff,
            is_superuser: e.is_superuser,
            created_at: e.created_at,
            last_login: e.last_login,
        }
    }
}

impl From<token::Model> for Token {
    fn from(e: token::Model) -> Self {
        Self {
            key: e.key,
            user_id: e.user_id,
            created_at: e.created_at,
        }
    }
}

/// Exact conversion to hundredths; `None` if the value does not fit.
pub fn price_to_cents(price: Decimal) -> Option<i64> {
    let mut p = price;
    p.rescale(2);
    i64::try_from(p.mantissa()).ok()
}

/// Always two decimal places, so `5` renders as `"5.00"`.
pub fn cents_to_price(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}
