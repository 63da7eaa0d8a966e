//! User Redis operations.
//!
//! Redis key patterns:
//! - `user:next_id` — id counter (INCR)
//! - `user:{id}` — user record (JSON)
//! - `user_email:{email}` — normalized email lookup to user id (STRING)
//! - `user_username:{username}` — username lookup to user id (STRING)
//!
//! ## Security: Zeroizing Sensitive Data
//!
//! User JSON carries the password hash. The raw JSON read from Redis is
//! wrapped in `Zeroizing` so the application-side copy is cleared after
//! deserialization.

use super::{connect, unix_now, StoreError, UserDirectory};
use crate::models::{NewUser, UserId, UserRecord};
use async_trait::async_trait;
use redis::AsyncCommands;
use zeroize::Zeroizing;

const USER_PREFIX: &str = "user:";
const USER_ID_COUNTER: &str = "user:next_id";
const EMAIL_PREFIX: &str = "user_email:";
const USERNAME_PREFIX: &str = "user_username:";

/// Create a user atomically.
///
/// Single Lua script: the email and username checks, id allocation and all
/// writes happen together, so two concurrent registrations for the same email
/// or username cannot both succeed. Returns `StoreError::Conflict` on
/// collision.
pub async fn create_user<C>(con: &mut C, user: &NewUser) -> Result<UserRecord, StoreError>
where
    C: AsyncCommands,
{
    let email_key = format!("{}{}", EMAIL_PREFIX, user.email);
    let username_key = format!("{}{}", USERNAME_PREFIX, user.username);
    let now = unix_now();

    let script = redis::Script::new(
        r"
        if redis.call('EXISTS', KEYS[2]) == 1 then
            return 0
        end
        if redis.call('EXISTS', KEYS[3]) == 1 then
            return -1
        end
        local id = redis.call('INCR', KEYS[1])
        local user = {
            id = id,
            username = ARGV[1],
            email = ARGV[2],
            password_hash = ARGV[3],
            created_at = tonumber(ARGV[4]),
            updated_at = tonumber(ARGV[4])
        }
        redis.call('SET', ARGV[5] .. id, cjson.encode(user))
        redis.call('SET', KEYS[2], id)
        redis.call('SET', KEYS[3], id)
        return id
        ",
    );

    let id: UserId = script
        .key(USER_ID_COUNTER)
        .key(&email_key)
        .key(&username_key)
        .arg(&user.username)
        .arg(&user.email)
        .arg(&user.password_hash)
        .arg(now)
        .arg(USER_PREFIX)
        .invoke_async(con)
        .await?;

    match id {
        0 => {
            return Err(StoreError::Conflict(format!(
                "email '{}' is already registered",
                user.email
            )))
        }
        -1 => {
            return Err(StoreError::Conflict(format!(
                "username '{}' is taken",
                user.username
            )))
        }
        _ => {}
    }

    Ok(UserRecord {
        id,
        username: user.username.clone(),
        email: user.email.clone(),
        password_hash: user.password_hash.clone(),
        created_at: now,
        updated_at: now,
    })
}

/// Get a user by ID.
///
/// The user JSON is zeroized after deserialization.
pub async fn get_user<C>(con: &mut C, id: UserId) -> Result<Option<UserRecord>, StoreError>
where
    C: AsyncCommands,
{
    let key = format!("{}{}", USER_PREFIX, id);
    let json: Option<String> = con.get(&key).await?;

    match json {
        Some(data) => {
            let zeroizing_data = Zeroizing::new(data);
            let user = serde_json::from_str(&zeroizing_data)?;
            Ok(Some(user))
        }
        None => Ok(None),
    }
}

/// Get a user by normalized email.
///
/// Performs a two-step lookup: email -> user_id -> user data.
pub async fn get_user_by_email<C>(
    con: &mut C,
    email: &str,
) -> Result<Option<UserRecord>, StoreError>
where
    C: AsyncCommands,
{
    let email_key = format!("{}{}", EMAIL_PREFIX, email);
    let user_id: Option<UserId> = con.get(&email_key).await?;

    match user_id {
        Some(id) => get_user(con, id).await,
        None => Ok(None),
    }
}

/// [`UserDirectory`] backed by Redis.
#[derive(Clone)]
pub struct RedisUserDirectory {
    client: redis::Client,
}

impl RedisUserDirectory {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UserDirectory for RedisUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let mut con = connect(&self.client).await?;
        get_user_by_email(&mut con, email).await
    }

    async fn create(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let mut con = connect(&self.client).await?;
        create_user(&mut con, &user).await
    }
}
