use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo::User;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// A tri-state JSON field: absent from the payload, explicit `null`, or a
/// value. The profile update contract treats absent and null differently
/// (null clears age/budget but leaves string fields untouched), so a plain
/// `Option` is not enough.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch<T> {
    Missing,
    Null,
    Value(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Missing
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Patch::Value(value),
            None => Patch::Null,
        })
    }
}

/// Numeric form fields arrive either as JSON numbers or as strings
/// (including the empty string, which means "clear").
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(f64),
    Text(String),
}

/// Interests arrive either as an ordered list or as one comma-separated
/// string; both normalize to the same capped list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum InterestsInput {
    List(Vec<String>),
    Csv(String),
}

/// Sparse partial update of the profile. Unknown fields are ignored, which
/// is what keeps the update allow-listed.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateProfileRequest {
    pub name: Patch<String>,
    pub phone: Patch<String>,
    pub gender: Patch<String>,
    pub age: Patch<NumberOrText>,
    pub city: Patch<String>,
    pub budget: Patch<NumberOrText>,
    pub bio: Patch<String>,
    pub preferences: Patch<String>,
    pub availability: Patch<String>,
    pub interests: Patch<InterestsInput>,
}

/// Query string for the roommate search. All filters optional; budgetMax is
/// taken as text so a non-numeric value can be ignored instead of rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RoommateParams {
    pub city: Option<String>,
    pub gender: Option<String>,
    #[serde(rename = "budgetMax")]
    pub budget_max: Option<String>,
}

/// Public part of the user returned by register/login.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
}

/// Standard `{success, data}` envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// JSON-safe projection of a user record. The password hash has no field
/// here, so it cannot leak through any read path.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub gender: Option<String>,
    pub age: Option<i32>,
    pub city: String,
    pub budget: Option<f64>,
    pub bio: String,
    pub preferences: String,
    pub availability: String,
    pub interests: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            gender: user.gender,
            age: user.age,
            city: user.city,
            budget: user.budget,
            bio: user.bio,
            preferences: user.preferences,
            availability: user.availability,
            interests: user.interests,
            updated_at: user.updated_at,
            created_at: user.created_at,
        }
    }
}
