//! Shipping address types.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use shopfront_core::{AddressId, UserId};

/// A saved address.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    /// Free-form label such as "Home" or "Work".
    #[serde(rename = "type")]
    pub kind: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
    pub phone_number: String,
}

/// Copy of an address frozen into an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSnapshot {
    #[serde(rename = "type")]
    pub kind: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
    pub phone_number: String,
}

impl From<&Address> for AddressSnapshot {
    fn from(address: &Address) -> Self {
        Self {
            kind: address.kind.clone(),
            street: address.street.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            country: address.country.clone(),
            postal_code: address.postal_code.clone(),
            phone_number: address.phone_number.clone(),
        }
    }
}

/// Body of `POST /address`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAddress {
    #[serde(rename = "type")]
    pub kind: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
    pub phone_number: String,
}

impl NewAddress {
    /// Every field is required and must not be blank.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first blank field.
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("type", &self.kind),
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("country", &self.country),
            ("postalCode", &self.postal_code),
            ("phoneNumber", &self.phone_number),
        ];
        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((name, _)) => Err(format!("{name} is required")),
            None => Ok(()),
        }
    }
}

/// Body of `PATCH /address/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressUpdate {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub phone_number: Option<String>,
}

impl AddressUpdate {
    /// Present fields must not be blank.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first blank field.
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("type", &self.kind),
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("country", &self.country),
            ("postalCode", &self.postal_code),
            ("phoneNumber", &self.phone_number),
        ];
        match fields
            .iter()
            .find(|(_, value)| value.as_ref().is_some_and(|v| v.trim().is_empty()))
        {
            Some((name, _)) => Err(format!("{name} cannot be empty")),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn body() -> serde_json::Value {
        serde_json::json!({
            "type": "Home",
            "street": "12 Long St",
            "city": "Cape Town",
            "state": "Western Cape",
            "country": "South Africa",
            "postalCode": "8001",
            "phoneNumber": "+27 21 555 0100"
        })
    }

    #[test]
    fn test_new_address_uses_type_key() {
        let address: NewAddress = serde_json::from_value(body()).unwrap();
        assert_eq!(address.kind, "Home");
        assert!(address.validate().is_ok());
    }

    #[test]
    fn test_new_address_rejects_blank_field() {
        let mut value = body();
        value["city"] = serde_json::json!(" ");
        let address: NewAddress = serde_json::from_value(value).unwrap();
        assert_eq!(address.validate().unwrap_err(), "city is required");
    }

    #[test]
    fn test_new_address_missing_field_fails_to_parse() {
        let mut value = body();
        value.as_object_mut().unwrap().remove("postalCode");
        assert!(serde_json::from_value::<NewAddress>(value).is_err());
    }

    #[test]
    fn test_update_rejects_blank_present_field() {
        let update = AddressUpdate {
            street: Some(String::new()),
            ..AddressUpdate::default()
        };
        assert!(update.validate().is_err());
        assert!(AddressUpdate::default().validate().is_ok());
    }
}
