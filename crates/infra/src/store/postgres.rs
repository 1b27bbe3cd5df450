//! Postgres-backed record store implementation.
//!
//! Quantity changes are single conditional `UPDATE ... RETURNING` statements,
//! so the database linearizes concurrent reservations on the same vehicle:
//! `quantity - 1 WHERE quantity > 0` can only succeed as many times as there
//! are units.
//!
//! ## Error Mapping
//!
//! | SQLx error | PostgreSQL code | `StoreError` |
//! |------------|-----------------|--------------|
//! | foreign key violation | `23503` | `ForeignKey` |
//! | check violation | `23514` | `Constraint` |
//! | unique violation | `23505` | `Constraint` |
//! | numeric value out of range | `22003` | `Constraint` |
//! | other database error | any | `Unavailable` |
//! | pool closed / timed out, IO, TLS | n/a | `Unavailable` |

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use fleetrent_core::{CustomerId, RentalId, VehicleId};
use fleetrent_customers::{Customer, NewCustomer};
use fleetrent_fleet::{NewVehicle, Vehicle};
use fleetrent_rentals::{NewRental, Rental, RentalPatch, RentalPeriod};

use super::r#trait::{RecordKind, RecordStore, StoreCounts, StoreError};

/// Schema applied by [`PostgresRecordStore::ensure_schema`].
pub const SCHEMA: &str = include_str!("../../migrations/0001_fleetrent.sql");

const VEHICLE_COLUMNS: &str = "id, make, model, year, unit_price, quantity, photo";
const CUSTOMER_COLUMNS: &str = "id, last_name, first_name, email, phone";
const RENTAL_COLUMNS: &str = "id, customer_id, vehicle_id, start_date, end_date";

/// Postgres-backed record store.
///
/// Uses an SQLx connection pool, so it is `Send + Sync` and cheap to share.
#[derive(Debug, Clone)]
pub struct PostgresRecordStore {
    pool: Arc<PgPool>,
}

impl PostgresRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    async fn vehicle_exists(&self, id: VehicleId) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM vehicles WHERE id = $1) AS present")
            .bind(id.as_uuid())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("vehicle_exists", e))?;
        row.try_get("present")
            .map_err(|e| StoreError::Decode(format!("vehicle_exists: {e}")))
    }

    /// Turn an empty conditional update into `OutOfStock` or `NotFound`.
    async fn missing_or_out_of_stock(&self, id: VehicleId) -> StoreError {
        match self.vehicle_exists(id).await {
            Ok(true) => StoreError::OutOfStock(id),
            Ok(false) => StoreError::not_found(RecordKind::Vehicle, id),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    #[instrument(skip(self, customer), err)]
    async fn insert_customer(&self, customer: NewCustomer) -> Result<Customer, StoreError> {
        let sql = format!(
            "INSERT INTO customers ({CUSTOMER_COLUMNS}) VALUES ($1, $2, $3, $4, $5) \
             RETURNING {CUSTOMER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::now_v7())
            .bind(&customer.last_name)
            .bind(&customer.first_name)
            .bind(&customer.email)
            .bind(&customer.phone)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_customer", e))?;
        customer_from_row(&row)
    }

    #[instrument(skip(self), fields(customer_id = %id), err)]
    async fn get_customer(&self, id: CustomerId) -> Result<Customer, StoreError> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_customer", e))?
            .ok_or_else(|| StoreError::not_found(RecordKind::Customer, id))?;
        customer_from_row(&row)
    }

    #[instrument(skip(self, customer), fields(customer_id = %customer.id), err)]
    async fn update_customer(&self, customer: Customer) -> Result<Customer, StoreError> {
        let sql = format!(
            "UPDATE customers SET last_name = $2, first_name = $3, email = $4, phone = $5 \
             WHERE id = $1 RETURNING {CUSTOMER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(customer.id.as_uuid())
            .bind(&customer.last_name)
            .bind(&customer.first_name)
            .bind(&customer.email)
            .bind(&customer.phone)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_customer", e))?
            .ok_or_else(|| StoreError::not_found(RecordKind::Customer, customer.id))?;
        customer_from_row(&row)
    }

    #[instrument(skip(self), fields(customer_id = %id), err)]
    async fn delete_customer(&self, id: CustomerId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_customer", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(RecordKind::Customer, id));
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_customers(&self) -> Result<Vec<Customer>, StoreError> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_customers", e))?;
        rows.iter().map(customer_from_row).collect()
    }

    #[instrument(skip(self, vehicle), err)]
    async fn insert_vehicle(&self, vehicle: NewVehicle) -> Result<Vehicle, StoreError> {
        let sql = format!(
            "INSERT INTO vehicles ({VEHICLE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {VEHICLE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::now_v7())
            .bind(&vehicle.make)
            .bind(&vehicle.model)
            .bind(i16::try_from(vehicle.year).map_err(|_| out_of_range("year"))?)
            .bind(i64::try_from(vehicle.unit_price).map_err(|_| out_of_range("unit_price"))?)
            .bind(i32::try_from(vehicle.quantity).map_err(|_| out_of_range("quantity"))?)
            .bind(&vehicle.photo)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_vehicle", e))?;
        vehicle_from_row(&row)
    }

    #[instrument(skip(self), fields(vehicle_id = %id), err)]
    async fn get_vehicle(&self, id: VehicleId) -> Result<Vehicle, StoreError> {
        let sql = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_vehicle", e))?
            .ok_or_else(|| StoreError::not_found(RecordKind::Vehicle, id))?;
        vehicle_from_row(&row)
    }

    #[instrument(skip(self, vehicle), fields(vehicle_id = %vehicle.id), err)]
    async fn update_vehicle_details(&self, vehicle: Vehicle) -> Result<Vehicle, StoreError> {
        let sql = format!(
            "UPDATE vehicles SET make = $2, model = $3, year = $4, unit_price = $5, photo = $6 \
             WHERE id = $1 RETURNING {VEHICLE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(vehicle.id.as_uuid())
            .bind(&vehicle.make)
            .bind(&vehicle.model)
            .bind(i16::try_from(vehicle.year).map_err(|_| out_of_range("year"))?)
            .bind(i64::try_from(vehicle.unit_price).map_err(|_| out_of_range("unit_price"))?)
            .bind(&vehicle.photo)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_vehicle_details", e))?
            .ok_or_else(|| StoreError::not_found(RecordKind::Vehicle, vehicle.id))?;
        vehicle_from_row(&row)
    }

    #[instrument(skip(self), fields(vehicle_id = %id), err)]
    async fn delete_vehicle(&self, id: VehicleId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM vehicles WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_vehicle", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(RecordKind::Vehicle, id));
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, StoreError> {
        let sql = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles ORDER BY id DESC");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_vehicles", e))?;
        rows.iter().map(vehicle_from_row).collect()
    }

    #[instrument(skip(self), fields(vehicle_id = %id), err)]
    async fn conditional_decrement_quantity(&self, id: VehicleId) -> Result<Vehicle, StoreError> {
        let sql = format!(
            "UPDATE vehicles SET quantity = quantity - 1 \
             WHERE id = $1 AND quantity > 0 RETURNING {VEHICLE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("conditional_decrement_quantity", e))?;
        match row {
            Some(row) => vehicle_from_row(&row),
            None => Err(self.missing_or_out_of_stock(id).await),
        }
    }

    #[instrument(skip(self), fields(vehicle_id = %id), err)]
    async fn increment_quantity(&self, id: VehicleId) -> Result<Vehicle, StoreError> {
        let sql = format!(
            "UPDATE vehicles SET quantity = quantity + 1 WHERE id = $1 RETURNING {VEHICLE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("increment_quantity", e))?
            .ok_or_else(|| StoreError::not_found(RecordKind::Vehicle, id))?;
        vehicle_from_row(&row)
    }

    #[instrument(skip(self), fields(vehicle_id = %id), err)]
    async fn adjust_quantity(&self, id: VehicleId, delta: i64) -> Result<Vehicle, StoreError> {
        let delta = i32::try_from(delta).map_err(|_| out_of_range("delta"))?;
        let sql = format!(
            "UPDATE vehicles SET quantity = quantity + $2 \
             WHERE id = $1 AND quantity + $2 >= 0 RETURNING {VEHICLE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(delta)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("adjust_quantity", e))?;
        match row {
            Some(row) => vehicle_from_row(&row),
            None => Err(self.missing_or_out_of_stock(id).await),
        }
    }

    #[instrument(
        skip(self, rental),
        fields(customer_id = %rental.customer_id, vehicle_id = %rental.vehicle_id),
        err
    )]
    async fn insert_rental(&self, rental: NewRental) -> Result<Rental, StoreError> {
        let sql = format!(
            "INSERT INTO rentals ({RENTAL_COLUMNS}) VALUES ($1, $2, $3, $4, $5) \
             RETURNING {RENTAL_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::now_v7())
            .bind(rental.customer_id.as_uuid())
            .bind(rental.vehicle_id.as_uuid())
            .bind(rental.period.start())
            .bind(rental.period.end())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_rental", e))?;
        rental_from_row(&row)
    }

    #[instrument(skip(self), fields(rental_id = %id), err)]
    async fn get_rental(&self, id: RentalId) -> Result<Rental, StoreError> {
        let sql = format!("SELECT {RENTAL_COLUMNS} FROM rentals WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_rental", e))?
            .ok_or_else(|| StoreError::not_found(RecordKind::Rental, id))?;
        rental_from_row(&row)
    }

    #[instrument(skip(self, patch), fields(rental_id = %id), err)]
    async fn update_rental(&self, id: RentalId, patch: RentalPatch) -> Result<Rental, StoreError> {
        // The CHECK constraint on the table re-validates the merged range.
        let sql = format!(
            "UPDATE rentals SET \
                customer_id = COALESCE($2, customer_id), \
                vehicle_id = COALESCE($3, vehicle_id), \
                start_date = COALESCE($4, start_date), \
                end_date = COALESCE($5, end_date) \
             WHERE id = $1 RETURNING {RENTAL_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(patch.customer_id.map(Uuid::from))
            .bind(patch.vehicle_id.map(Uuid::from))
            .bind(patch.start)
            .bind(patch.end)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_rental", e))?
            .ok_or_else(|| StoreError::not_found(RecordKind::Rental, id))?;
        rental_from_row(&row)
    }

    #[instrument(skip(self), fields(rental_id = %id), err)]
    async fn delete_rental(&self, id: RentalId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM rentals WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_rental", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(RecordKind::Rental, id));
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_rentals(&self) -> Result<Vec<Rental>, StoreError> {
        let sql = format!("SELECT {RENTAL_COLUMNS} FROM rentals ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_rentals", e))?;
        rows.iter().map(rental_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn counts(&self) -> Result<StoreCounts, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM customers) AS customers,
                (SELECT COUNT(*) FROM vehicles) AS vehicles,
                (SELECT COUNT(*) FROM rentals) AS rentals,
                (SELECT COALESCE(SUM(quantity), 0) FROM vehicles)::BIGINT AS units_available
            "#,
        )
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("counts", e))?;

        let count = |column: &str| -> Result<u64, StoreError> {
            let value: i64 = row
                .try_get(column)
                .map_err(|e| StoreError::Decode(format!("counts.{column}: {e}")))?;
            u64::try_from(value).map_err(|_| StoreError::Decode(format!("counts.{column} is negative")))
        };

        Ok(StoreCounts {
            customers: count("customers")?,
            vehicles: count("vehicles")?,
            rentals: count("rentals")?,
            units_available: count("units_available")?,
        })
    }
}

fn out_of_range(field: &str) -> StoreError {
    StoreError::Constraint(format!("{field} is out of range for the column"))
}

fn decode(table: &str, e: sqlx::Error) -> StoreError {
    StoreError::Decode(format!("failed to read {table} row: {e}"))
}

fn customer_from_row(row: &PgRow) -> Result<Customer, StoreError> {
    let id: Uuid = row.try_get("id").map_err(|e| decode("customers", e))?;
    Ok(Customer {
        id: CustomerId::from_uuid(id),
        last_name: row.try_get("last_name").map_err(|e| decode("customers", e))?,
        first_name: row.try_get("first_name").map_err(|e| decode("customers", e))?,
        email: row.try_get("email").map_err(|e| decode("customers", e))?,
        phone: row.try_get("phone").map_err(|e| decode("customers", e))?,
    })
}

fn vehicle_from_row(row: &PgRow) -> Result<Vehicle, StoreError> {
    let id: Uuid = row.try_get("id").map_err(|e| decode("vehicles", e))?;
    let year: i16 = row.try_get("year").map_err(|e| decode("vehicles", e))?;
    let unit_price: i64 = row.try_get("unit_price").map_err(|e| decode("vehicles", e))?;
    let quantity: i32 = row.try_get("quantity").map_err(|e| decode("vehicles", e))?;
    Ok(Vehicle {
        id: VehicleId::from_uuid(id),
        make: row.try_get("make").map_err(|e| decode("vehicles", e))?,
        model: row.try_get("model").map_err(|e| decode("vehicles", e))?,
        year: u16::try_from(year).map_err(|_| StoreError::Decode(format!("vehicle {id}: negative year")))?,
        unit_price: u64::try_from(unit_price)
            .map_err(|_| StoreError::Decode(format!("vehicle {id}: negative unit_price")))?,
        quantity: u32::try_from(quantity)
            .map_err(|_| StoreError::Decode(format!("vehicle {id}: negative quantity")))?,
        photo: row.try_get("photo").map_err(|e| decode("vehicles", e))?,
    })
}

fn rental_from_row(row: &PgRow) -> Result<Rental, StoreError> {
    let id: Uuid = row.try_get("id").map_err(|e| decode("rentals", e))?;
    let customer_id: Uuid = row.try_get("customer_id").map_err(|e| decode("rentals", e))?;
    let vehicle_id: Uuid = row.try_get("vehicle_id").map_err(|e| decode("rentals", e))?;
    let start: NaiveDate = row.try_get("start_date").map_err(|e| decode("rentals", e))?;
    let end: NaiveDate = row.try_get("end_date").map_err(|e| decode("rentals", e))?;
    let period = RentalPeriod::new(start, end)
        .map_err(|e| StoreError::Decode(format!("rental {id}: {e}")))?;
    Ok(Rental {
        id: RentalId::from_uuid(id),
        customer_id: CustomerId::from_uuid(customer_id),
        vehicle_id: VehicleId::from_uuid(vehicle_id),
        period,
    })
}

/// Map SQLx errors to `StoreError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            classify_sqlstate(db_err.code().as_deref(), msg)
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("timed out acquiring a connection in {operation}"))
        }
        other => StoreError::Unavailable(format!("sqlx error in {operation}: {other}")),
    }
}

fn classify_sqlstate(code: Option<&str>, msg: String) -> StoreError {
    match code {
        Some("23503") => StoreError::ForeignKey(msg),
        // 22003: `quantity + 1` past INTEGER range.
        Some("23514") | Some("23505") | Some("22003") => StoreError::Constraint(msg),
        _ => StoreError::Unavailable(msg),
    }
}
