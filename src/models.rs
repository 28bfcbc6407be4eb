use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::ApiError;
use crate::store::{Item, PRODUCT_ID, product_id_of};

pub const OPERATION_SAVE: &str = "SAVE";
pub const OPERATION_UPDATE: &str = "UPDATE";
pub const OPERATION_DELETE: &str = "DELETE";
pub const SUCCESS: &str = "SUCCESS";

pub const UPDATE_KEY: &str = "updateKey";
pub const UPDATE_VALUE: &str = "updateValue";

/// Query parameters for fetching a single product
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductQuery {
    /// Key of the product to fetch
    #[serde(rename = "productId")]
    pub product_id: Option<String>,
}

/// Response type for a successful create
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct SaveResponse {
    #[serde(rename = "Operation")]
    pub operation: String,
    pub message: String,
    #[serde(rename = "Item")]
    #[schema(value_type = Object)]
    pub item: Item,
}

/// Response type for successful update and delete operations
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct MutationResponse {
    #[serde(rename = "Operation")]
    pub operation: String,
    #[serde(rename = "Message")]
    pub message: String,
    /// Updated attributes, or the deleted item's old values (`null` if it did not exist)
    #[serde(rename = "Item")]
    #[schema(value_type = Option<Object>)]
    pub item: Option<Item>,
}

/// Response type for the list endpoint
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ProductsResponse {
    #[schema(value_type = Vec<Object>)]
    pub products: Vec<Item>,
}

/// Body of a PATCH /product request
#[derive(Debug, PartialEq)]
pub struct UpdateRequest {
    pub product_id: String,
    pub update_key: String,
    pub update_value: JsonValue,
}

/// Parse a raw request body that must hold a JSON object
pub fn parse_object(body: &[u8]) -> Result<Item, ApiError> {
    match serde_json::from_slice::<JsonValue>(body)? {
        JsonValue::Object(map) => Ok(map),
        _ => Err(ApiError::BodyNotObject),
    }
}

/// The `productId` of a request body, which must be a non-empty string
pub fn require_product_id(body: &Item) -> Result<String, ApiError> {
    product_id_of(body)
        .map(str::to_string)
        .ok_or(ApiError::MissingField(PRODUCT_ID))
}

impl UpdateRequest {
    pub fn from_body(mut body: Item) -> Result<Self, ApiError> {
        let product_id = require_product_id(&body)?;

        let update_key = match body.get(UPDATE_KEY) {
            Some(JsonValue::String(key)) if !key.is_empty() => key.clone(),
            _ => return Err(ApiError::MissingField(UPDATE_KEY)),
        };
        if update_key == PRODUCT_ID {
            return Err(ApiError::InvalidField(format!(
                "{} cannot be changed with {}",
                PRODUCT_ID, UPDATE_KEY
            )));
        }

        // `null` is a legitimate value to set; only an absent field is rejected
        let update_value = body
            .remove(UPDATE_VALUE)
            .ok_or(ApiError::MissingField(UPDATE_VALUE))?;

        Ok(UpdateRequest {
            product_id,
            update_key,
            update_value,
        })
    }
}
