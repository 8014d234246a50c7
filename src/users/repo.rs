use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::services::{ProfileChanges, RoommateQuery};

/// Hard cap on roommate search results.
pub const ROOMMATE_LIMIT: i64 = 25;

const USER_COLUMNS: &str = "id, name, email, password_hash, phone, gender, age, city, budget, \
     bio, preferences, availability, interests, created_at, updated_at";

/// User record in the database. Deliberately not `Serialize`: every read
/// path goes through the profile projection, which has no hash field.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: String,
    pub gender: Option<String>,
    pub age: Option<i32>,
    pub city: String,
    pub budget: Option<f64>,
    pub bio: String,
    pub preferences: String,
    pub availability: String,
    pub interests: Vec<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    /// Find a user by normalized (lowercase) email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Create a new user with an already-hashed password. A unique-index
    /// violation on email bubbles up for the caller to map to a conflict.
    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> sqlx::Result<User> {
        let sql = format!(
            "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(name)
            .bind(email)
            .bind(password_hash)
            .fetch_one(db)
            .await
    }

    pub async fn list_all(db: &PgPool) -> sqlx::Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users");
        sqlx::query_as::<_, User>(&sql).fetch_all(db).await
    }

    /// Apply a normalized partial update to the caller's row and return the
    /// updated record. `updated_at` always moves, which is also what keeps
    /// the roommate ordering fresh.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> sqlx::Result<User> {
        let mut query = update_query(id, changes);
        query.build_query_as::<User>().fetch_one(db).await
    }

    /// Filtered roommate search: never the caller, never anyone who has
    /// stopped looking, newest updates first, capped.
    pub async fn find_roommates(
        db: &PgPool,
        caller: Uuid,
        filters: &RoommateQuery,
    ) -> sqlx::Result<Vec<User>> {
        let mut query = roommate_query(caller, filters);
        query.build_query_as::<User>().fetch_all(db).await
    }
}

fn update_query(id: Uuid, changes: &ProfileChanges) -> QueryBuilder<'static, Postgres> {
    let mut qb: QueryBuilder<'static, Postgres> =
        QueryBuilder::new("UPDATE users SET updated_at = now()");

    if let Some(name) = &changes.name {
        qb.push(", name = ").push_bind(name.clone());
    }
    if let Some(phone) = &changes.phone {
        qb.push(", phone = ").push_bind(phone.clone());
    }
    if let Some(gender) = &changes.gender {
        qb.push(", gender = ").push_bind(gender.clone());
    }
    if let Some(age) = &changes.age {
        qb.push(", age = ").push_bind(*age);
    }
    if let Some(city) = &changes.city {
        qb.push(", city = ").push_bind(city.clone());
    }
    if let Some(budget) = &changes.budget {
        qb.push(", budget = ").push_bind(*budget);
    }
    if let Some(bio) = &changes.bio {
        qb.push(", bio = ").push_bind(bio.clone());
    }
    if let Some(preferences) = &changes.preferences {
        qb.push(", preferences = ").push_bind(preferences.clone());
    }
    if let Some(availability) = &changes.availability {
        qb.push(", availability = ").push_bind(availability.clone());
    }
    if let Some(interests) = &changes.interests {
        qb.push(", interests = ").push_bind(interests.clone());
    }

    qb.push(" WHERE id = ").push_bind(id);
    qb.push(format!(" RETURNING {USER_COLUMNS}"));
    qb
}

fn roommate_query(caller: Uuid, filters: &RoommateQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb: QueryBuilder<'static, Postgres> =
        QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE id <> "));
    qb.push_bind(caller);
    qb.push(" AND availability <> ").push_bind("not-looking");

    if let Some(city) = &filters.city {
        qb.push(" AND city ILIKE ")
            .push_bind(format!("%{}%", escape_like(city)));
    }
    if let Some(gender) = &filters.gender {
        qb.push(" AND gender = ").push_bind(gender.clone());
    }
    if let Some(budget_max) = filters.budget_max {
        qb.push(" AND budget <= ").push_bind(budget_max);
    }

    qb.push(" ORDER BY updated_at DESC LIMIT ").push_bind(ROOMMATE_LIMIT);
    qb
}

/// Escape LIKE metacharacters so the city filter stays a literal substring
/// match.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
