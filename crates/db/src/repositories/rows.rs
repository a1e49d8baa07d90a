//! Column codecs shared by the SQLite store. Money is decimal text, ids are
//! hyphenated UUID text, timestamps are RFC 3339 UTC with microseconds so
//! lexical order matches chronological order.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use stockroom_core::domain::customer::{Customer, CustomerId};
use stockroom_core::domain::inventory::{InventoryMovement, MovementId, MovementType};
use stockroom_core::domain::product::{Product, ProductId};
use stockroom_core::domain::UserId;

use super::RepositoryError;

pub(crate) const PRODUCT_COLUMNS: &str = "p.id AS id, p.name AS name, p.description AS description, \
     p.price AS price, p.stock_quantity AS stock_quantity, p.min_stock_level AS min_stock_level, \
     p.category AS category, p.barcode AS barcode, p.user_id AS user_id, \
     p.created_at AS created_at, p.updated_at AS updated_at";

pub(crate) const MOVEMENT_COLUMNS: &str = "id, product_id, movement_type, quantity_change, \
     previous_stock, new_stock, notes, user_id, created_at";

pub(crate) const CUSTOMER_COLUMNS: &str = "id, name, email, phone, address, user_id, created_at";

pub(crate) fn encode_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_timestamp(
    row: &SqliteRow,
    column: &str,
) -> Result<DateTime<Utc>, RepositoryError> {
    let raw: String = row.try_get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("{column} `{raw}`: {error}")))
}

pub(crate) fn decode_uuid(row: &SqliteRow, column: &str) -> Result<Uuid, RepositoryError> {
    let raw: String = row.try_get(column)?;
    Uuid::parse_str(&raw)
        .map_err(|error| RepositoryError::Decode(format!("{column} `{raw}`: {error}")))
}

pub(crate) fn decode_optional_uuid(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<Uuid>, RepositoryError> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|value| {
        Uuid::parse_str(&value)
            .map_err(|error| RepositoryError::Decode(format!("{column} `{value}`: {error}")))
    })
    .transpose()
}

pub(crate) fn decode_decimal(row: &SqliteRow, column: &str) -> Result<Decimal, RepositoryError> {
    let raw: String = row.try_get(column)?;
    Decimal::from_str(&raw)
        .map_err(|error| RepositoryError::Decode(format!("{column} `{raw}`: {error}")))
}

pub(crate) fn product_from_row(row: &SqliteRow) -> Result<Product, RepositoryError> {
    Ok(Product {
        id: ProductId(decode_uuid(row, "id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: decode_decimal(row, "price")?,
        stock_quantity: row.try_get("stock_quantity")?,
        min_stock_level: row.try_get("min_stock_level")?,
        category: row.try_get("category")?,
        barcode: row.try_get("barcode")?,
        user_id: UserId(decode_uuid(row, "user_id")?),
        created_at: decode_timestamp(row, "created_at")?,
        updated_at: decode_timestamp(row, "updated_at")?,
    })
}

pub(crate) fn movement_from_row(row: &SqliteRow) -> Result<InventoryMovement, RepositoryError> {
    let movement_type: String = row.try_get("movement_type")?;
    Ok(InventoryMovement {
        id: MovementId(decode_uuid(row, "id")?),
        product_id: ProductId(decode_uuid(row, "product_id")?),
        movement_type: MovementType::from_str(&movement_type)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?,
        quantity_change: row.try_get("quantity_change")?,
        previous_stock: row.try_get("previous_stock")?,
        new_stock: row.try_get("new_stock")?,
        notes: row.try_get("notes")?,
        user_id: UserId(decode_uuid(row, "user_id")?),
        created_at: decode_timestamp(row, "created_at")?,
    })
}

pub(crate) fn customer_from_row(row: &SqliteRow) -> Result<Customer, RepositoryError> {
    Ok(Customer {
        id: CustomerId(decode_uuid(row, "id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
        user_id: UserId(decode_uuid(row, "user_id")?),
        created_at: decode_timestamp(row, "created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::encode_timestamp;

    #[test]
    fn timestamps_encode_with_fixed_microsecond_width() {
        let timestamp = Utc.with_ymd_and_hms(2026, 3, 1, 9, 5, 0).single().expect("timestamp");
        assert_eq!(encode_timestamp(&timestamp), "2026-03-01T09:05:00.000000Z");
    }
}
