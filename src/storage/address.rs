//! Address Redis operations.
//!
//! Redis key patterns:
//! - `address:next_id` — id counter (INCR)
//! - `address:{id}` — address record (JSON)
//! - `user_addresses:{owner_id}` — SET of address IDs owned by user
//!
//! Every write that may set `is_default` runs as one Lua script which demotes
//! the owner's other defaults and performs the write together. Redis executes
//! scripts atomically, so concurrent default-setting writes for the same owner
//! cannot leave two defaults behind.

use super::{connect, unix_now, AddressStore, StoreError};
use crate::models::{AddressId, NewAddress, OwnedAddress, UserId};
use async_trait::async_trait;
use redis::AsyncCommands;

const ADDRESS_PREFIX: &str = "address:";
const ADDRESS_ID_COUNTER: &str = "address:next_id";
const USER_ADDRESSES_PREFIX: &str = "user_addresses:";

/// Lua helper shared by the write scripts. Demotes every default address in
/// `set_key` except `keep_id` and returns how many were changed.
const DEMOTE_OTHERS_LUA: &str = r"
local function demote_others(set_key, prefix, keep_id, now)
    local demoted = 0
    for _, aid in ipairs(redis.call('SMEMBERS', set_key)) do
        if aid ~= keep_id then
            local key = prefix .. aid
            local raw = redis.call('GET', key)
            if raw then
                local other = cjson.decode(raw)
                if other.is_default then
                    other.is_default = false
                    other.updated_at = now
                    redis.call('SET', key, cjson.encode(other))
                    demoted = demoted + 1
                end
            end
        end
    end
    return demoted
end
";

fn user_addresses_key(owner_id: UserId) -> String {
    format!("{}{}", USER_ADDRESSES_PREFIX, owner_id)
}

fn address_key(id: AddressId) -> String {
    format!("{}{}", ADDRESS_PREFIX, id)
}

fn script_with_demote(body: &str) -> redis::Script {
    redis::Script::new(&format!("{}\n{}", DEMOTE_OTHERS_LUA, body))
}

/// Insert an address, demoting the owner's current default first when the
/// new address is itself the default.
pub async fn insert_address<C>(con: &mut C, address: &NewAddress) -> Result<OwnedAddress, StoreError>
where
    C: AsyncCommands,
{
    let json = serde_json::to_string(address)?;

    let script = script_with_demote(
        r"
        local addr = cjson.decode(ARGV[1])
        local now = tonumber(ARGV[2])
        if addr.is_default then
            demote_others(KEYS[2], ARGV[3], '', now)
        end
        local id = redis.call('INCR', KEYS[1])
        addr.id = id
        addr.created_at = now
        addr.updated_at = now
        local encoded = cjson.encode(addr)
        redis.call('SET', ARGV[3] .. id, encoded)
        redis.call('SADD', KEYS[2], id)
        return encoded
        ",
    );

    let stored: String = script
        .key(ADDRESS_ID_COUNTER)
        .key(user_addresses_key(address.owner_id))
        .arg(json)
        .arg(unix_now())
        .arg(ADDRESS_PREFIX)
        .invoke_async(con)
        .await?;

    Ok(serde_json::from_str(&stored)?)
}

/// Get an address by ID.
pub async fn get_address<C>(con: &mut C, id: AddressId) -> Result<Option<OwnedAddress>, StoreError>
where
    C: AsyncCommands,
{
    let json: Option<String> = con.get(address_key(id)).await?;

    match json {
        Some(data) => Ok(Some(serde_json::from_str(&data)?)),
        None => Ok(None),
    }
}

/// Replace an address, demoting the owner's other defaults in the same step
/// when the replacement is the default.
///
/// Returns `None` when the address vanished or is now owned by someone else.
pub async fn update_address<C>(
    con: &mut C,
    address: &OwnedAddress,
) -> Result<Option<OwnedAddress>, StoreError>
where
    C: AsyncCommands,
{
    let json = serde_json::to_string(address)?;

    let script = script_with_demote(
        r"
        local raw = redis.call('GET', KEYS[1])
        if not raw then
            return nil
        end
        local existing = cjson.decode(raw)
        local addr = cjson.decode(ARGV[1])
        if existing.owner_id ~= addr.owner_id then
            return nil
        end
        addr.created_at = existing.created_at
        addr.updated_at = tonumber(ARGV[2])
        if addr.is_default then
            demote_others(KEYS[2], ARGV[3], ARGV[4], addr.updated_at)
        end
        local encoded = cjson.encode(addr)
        redis.call('SET', KEYS[1], encoded)
        return encoded
        ",
    );

    let stored: Option<String> = script
        .key(address_key(address.id))
        .key(user_addresses_key(address.owner_id))
        .arg(json)
        .arg(unix_now())
        .arg(ADDRESS_PREFIX)
        .arg(address.id.to_string())
        .invoke_async(con)
        .await?;

    match stored {
        Some(data) => Ok(Some(serde_json::from_str(&data)?)),
        None => Ok(None),
    }
}

/// Delete an address and remove it from its owner's set.
///
/// Returns true if the address was deleted, false if it didn't exist.
pub async fn delete_address<C>(con: &mut C, id: AddressId) -> Result<bool, StoreError>
where
    C: AsyncCommands,
{
    let script = redis::Script::new(
        r"
        local raw = redis.call('GET', KEYS[1])
        if not raw then
            return 0
        end
        local addr = cjson.decode(raw)
        redis.call('DEL', KEYS[1])
        redis.call('SREM', ARGV[1] .. string.format('%d', addr.owner_id), ARGV[2])
        return 1
        ",
    );

    let deleted: i32 = script
        .key(address_key(id))
        .arg(USER_ADDRESSES_PREFIX)
        .arg(id.to_string())
        .invoke_async(con)
        .await?;

    Ok(deleted > 0)
}

/// Demote every default address of an owner.
pub async fn clear_default_for_owner<C>(con: &mut C, owner_id: UserId) -> Result<u64, StoreError>
where
    C: AsyncCommands,
{
    let script = script_with_demote(
        r"
        return demote_others(KEYS[1], ARGV[1], '', tonumber(ARGV[2]))
        ",
    );

    let demoted: u64 = script
        .key(user_addresses_key(owner_id))
        .arg(ADDRESS_PREFIX)
        .arg(unix_now())
        .invoke_async(con)
        .await?;

    Ok(demoted)
}

/// [`AddressStore`] backed by Redis.
#[derive(Clone)]
pub struct RedisAddressStore {
    client: redis::Client,
}

impl RedisAddressStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AddressStore for RedisAddressStore {
    async fn insert(&self, address: NewAddress) -> Result<OwnedAddress, StoreError> {
        let mut con = connect(&self.client).await?;
        insert_address(&mut con, &address).await
    }

    async fn get_by_id(&self, id: AddressId) -> Result<Option<OwnedAddress>, StoreError> {
        let mut con = connect(&self.client).await?;
        get_address(&mut con, id).await
    }

    async fn update_by_id(
        &self,
        address: &OwnedAddress,
    ) -> Result<Option<OwnedAddress>, StoreError> {
        let mut con = connect(&self.client).await?;
        update_address(&mut con, address).await
    }

    async fn delete_by_id(&self, id: AddressId) -> Result<bool, StoreError> {
        let mut con = connect(&self.client).await?;
        delete_address(&mut con, id).await
    }

    async fn clear_default_for_owner(&self, owner_id: UserId) -> Result<u64, StoreError> {
        let mut con = connect(&self.client).await?;
        clear_default_for_owner(&mut con, owner_id).await
    }
}
