//! Customer records and the address book.

use sqlx::PgPool;

use cozycat_core::{AddressId, CustomerId, UserId};

use super::RepositoryError;
use crate::models::{Address, AddressInput, Customer};

pub(crate) const CUSTOMER_COLUMNS: &str = "id, user_id, first_name, last_name, phone, email, \
     whatsapp_number, is_whatsapp_preferred, total_orders, total_spent, first_order_date, \
     last_order_date";

const ADDRESS_COLUMNS: &str = "id, customer_id, address_line1, address_line2, landmark, city, \
     state, pincode, latitude, longitude, is_default, delivery_notes, created_at";

/// Repository for customers and their saved addresses.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The customer record linked to a user account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_user(&self, user_id: UserId) -> Result<Option<Customer>, RepositoryError> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE user_id = $1");
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(customer)
    }

    /// Get the customer for `user_id`, creating one from the profile if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no profile.
    pub async fn ensure_for_user(&self, user_id: UserId) -> Result<Customer, RepositoryError> {
        if let Some(customer) = self.find_by_user(user_id).await? {
            return Ok(customer);
        }

        let sql = format!(
            r"
            INSERT INTO customers (user_id, first_name, last_name, phone, email)
            SELECT p.id,
                   COALESCE(NULLIF(split_part(p.full_name, ' ', 1), ''), 'Customer'),
                   NULLIF(substr(p.full_name, length(split_part(p.full_name, ' ', 1)) + 2), ''),
                   COALESCE(p.phone, ''),
                   p.email
            FROM profiles p
            WHERE p.id = $1
            ON CONFLICT (user_id) DO UPDATE SET updated_at = NOW()
            RETURNING {CUSTOMER_COLUMNS}
            "
        );
        sqlx::query_as::<_, Customer>(&sql)
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Saved addresses, default first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_addresses(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Address>, RepositoryError> {
        let sql = format!(
            "SELECT {ADDRESS_COLUMNS} FROM customer_addresses
             WHERE customer_id = $1 ORDER BY is_default DESC, created_at DESC"
        );
        let rows = sqlx::query_as::<_, Address>(&sql)
            .bind(customer_id)
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }

    /// Save a new address. The first address a customer saves becomes the default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn create_address(
        &self,
        customer_id: CustomerId,
        input: &AddressInput,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let address = insert_address(&mut tx, customer_id, input).await?;
        tx.commit().await?;
        Ok(address)
    }

    /// Replace an address owned by `customer_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address does not belong to the customer.
    pub async fn update_address(
        &self,
        customer_id: CustomerId,
        id: AddressId,
        input: &AddressInput,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if input.is_default {
            clear_default(&mut tx, customer_id).await?;
        }

        let sql = format!(
            r"
            UPDATE customer_addresses
            SET address_line1 = $3, address_line2 = $4, landmark = $5, city = $6, state = $7,
                pincode = $8, latitude = $9, longitude = $10,
                is_default = is_default OR $11, delivery_notes = $12
            WHERE id = $1 AND customer_id = $2
            RETURNING {ADDRESS_COLUMNS}
            "
        );
        let address = sqlx::query_as::<_, Address>(&sql)
            .bind(id)
            .bind(customer_id)
            .bind(&input.address_line1)
            .bind(&input.address_line2)
            .bind(&input.landmark)
            .bind(&input.city)
            .bind(&input.state)
            .bind(&input.pincode)
            .bind(input.latitude)
            .bind(input.longitude)
            .bind(input.is_default)
            .bind(&input.delivery_notes)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok(address)
    }

    /// Delete an address. If it was the default, the newest remaining one takes over.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address does not belong to the customer.
    pub async fn delete_address(
        &self,
        customer_id: CustomerId,
        id: AddressId,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let was_default: bool = sqlx::query_scalar(
            "DELETE FROM customer_addresses WHERE id = $1 AND customer_id = $2 RETURNING is_default",
        )
        .bind(id)
        .bind(customer_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        if was_default {
            sqlx::query(
                r"
                UPDATE customer_addresses SET is_default = TRUE
                WHERE id = (
                    SELECT id FROM customer_addresses WHERE customer_id = $1
                    ORDER BY created_at DESC LIMIT 1
                )
                ",
            )
            .bind(customer_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// An address owned by `customer_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_address(
        &self,
        customer_id: CustomerId,
        id: AddressId,
    ) -> Result<Option<Address>, RepositoryError> {
        let sql = format!(
            "SELECT {ADDRESS_COLUMNS} FROM customer_addresses WHERE id = $1 AND customer_id = $2"
        );
        let address = sqlx::query_as::<_, Address>(&sql)
            .bind(id)
            .bind(customer_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(address)
    }
}

/// Add an address to the customer's book inside `tx`.
///
/// The first address a customer saves becomes their default.
pub(crate) async fn insert_address(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    customer_id: CustomerId,
    input: &AddressInput,
) -> Result<Address, RepositoryError> {
    let existing: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM customer_addresses WHERE customer_id = $1")
            .bind(customer_id)
            .fetch_one(&mut **tx)
            .await?;
    let is_default = input.is_default || existing == 0;

    if is_default {
        clear_default(tx, customer_id).await?;
    }

    let sql = format!(
        r"
        INSERT INTO customer_addresses
            (customer_id, address_line1, address_line2, landmark, city, state, pincode,
             latitude, longitude, is_default, delivery_notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING {ADDRESS_COLUMNS}
        "
    );
    let address = sqlx::query_as::<_, Address>(&sql)
        .bind(customer_id)
        .bind(&input.address_line1)
        .bind(&input.address_line2)
        .bind(&input.landmark)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.pincode)
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(is_default)
        .bind(&input.delivery_notes)
        .fetch_one(&mut **tx)
        .await?;
    Ok(address)
}

async fn clear_default(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    customer_id: CustomerId,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE customer_addresses SET is_default = FALSE WHERE customer_id = $1 AND is_default")
        .bind(customer_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
