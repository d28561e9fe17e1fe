//! Address repository.

use sqlx::PgPool;

use shopfront_core::{AddressId, UserId};

use super::RepositoryError;
use crate::models::{Address, AddressUpdate, NewAddress};

const ADDRESS_COLUMNS: &str =
    "id, user_id, kind, street, city, state, country, postal_code, phone_number";

/// Repository for saved addresses.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All addresses saved by a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let addresses = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM shop.address WHERE user_id = $1 ORDER BY id"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(addresses)
    }

    /// Get an address by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        let address = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM shop.address WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(address)
    }

    /// Save a new address for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Invalid` if the user doesn't exist.
    pub async fn create(
        &self,
        user_id: UserId,
        new: &NewAddress,
    ) -> Result<Address, RepositoryError> {
        sqlx::query_as::<_, Address>(&format!(
            r"
            INSERT INTO shop.address
                (user_id, kind, street, city, state, country, postal_code, phone_number)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ADDRESS_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(new.kind.trim())
        .bind(new.street.trim())
        .bind(new.city.trim())
        .bind(new.state.trim())
        .bind(new.country.trim())
        .bind(new.postal_code.trim())
        .bind(new.phone_number.trim())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "address already exists"))
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address doesn't exist.
    pub async fn update(
        &self,
        id: AddressId,
        update: &AddressUpdate,
    ) -> Result<Address, RepositoryError> {
        sqlx::query_as::<_, Address>(&format!(
            r"
            UPDATE shop.address SET
                kind = COALESCE($2, kind),
                street = COALESCE($3, street),
                city = COALESCE($4, city),
                state = COALESCE($5, state),
                country = COALESCE($6, country),
                postal_code = COALESCE($7, postal_code),
                phone_number = COALESCE($8, phone_number)
            WHERE id = $1
            RETURNING {ADDRESS_COLUMNS}
            "
        ))
        .bind(id)
        .bind(update.kind.as_deref().map(str::trim))
        .bind(update.street.as_deref().map(str::trim))
        .bind(update.city.as_deref().map(str::trim))
        .bind(update.state.as_deref().map(str::trim))
        .bind(update.country.as_deref().map(str::trim))
        .bind(update.postal_code.as_deref().map(str::trim))
        .bind(update.phone_number.as_deref().map(str::trim))
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete an address and return it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address doesn't exist.
    pub async fn delete(&self, id: AddressId) -> Result<Address, RepositoryError> {
        sqlx::query_as::<_, Address>(&format!(
            "DELETE FROM shop.address WHERE id = $1 RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
