use std::future::Future;

use redis::{aio::MultiplexedConnection, AsyncCommands, FromRedisValue, ToRedisArgs};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{CacheError, Error, HtmlError};

// Caching - keys

#[derive(Serialize, Clone, Debug)]
pub struct CacheKey<T: ToString + Serialize> {
    _value: T,
    _type: CacheKeyType,
}

impl<T: ToString + Serialize> CacheKey<T> {
    pub fn from(r#type: CacheKeyType, key: T) -> Self {
        Self {
            _value: key,
            _type: r#type,
        }
    }
}

impl<T: ToString + Serialize> From<&CacheKey<T>> for String {
    fn from(key: &CacheKey<T>) -> Self {
        match &key._type {
            CacheKeyType::Ingredient => format!("ingredient-{}", key._value.to_string()),
            CacheKeyType::Tag => format!("tag-{}", key._value.to_string()),
            CacheKeyType::Custom(_) => key._value.to_string(),
        }
    }
}

impl<T: ToString + Serialize> std::fmt::Display for CacheKey<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from(self))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum CacheKeyType {
    Ingredient,
    Tag,
    Custom(String),
}

impl CacheKeyType {
    pub fn new<T: ToString + Serialize>(self, key: T) -> CacheKey<T> {
        CacheKey::from(self, key)
    }
}

impl<T: ToString + Serialize> From<&CacheKey<T>> for CacheLifetime {
    fn from(key: &CacheKey<T>) -> Self {
        match &key._type {
            CacheKeyType::Ingredient => CacheLifetime::BindIngredientCache,
            CacheKeyType::Tag => CacheLifetime::BindTagCache,
            CacheKeyType::Custom(value) => CacheLifetime::Custom(value.to_owned()),
        }
    }
}

// Cache - wrappers

/// What a cached value is bound to. A value is only served while the bind
/// it was stored with still matches the current one.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum CacheLifetime {
    Infinite,
    Custom(String),
    BindIngredientCache,
    BindTagCache,
}

impl CacheLifetime {
    pub fn bind_key(&self) -> Option<&'static str> {
        match self {
            CacheLifetime::BindIngredientCache => Some("ingredient-cache-key"),
            CacheLifetime::BindTagCache => Some("tag-cache-key"),
            CacheLifetime::Infinite | CacheLifetime::Custom(_) => None,
        }
    }

    pub async fn get_cache_bind(
        &self,
        cache: &mut MultiplexedConnection,
    ) -> Result<Option<String>, Error> {
        match self {
            CacheLifetime::Custom(value) => Ok(Some(value.to_owned())),
            _ => match self.bind_key() {
                Some(bind_key) => get_cache_value::<&str, String>(bind_key, cache).await,
                None => Ok(None),
            },
        }
    }

    pub async fn validate_cache_bind(
        &self,
        bind: &Option<String>,
        lifetime: Self,
        cache: &mut MultiplexedConnection,
    ) -> Result<bool, Error> {
        match self {
            CacheLifetime::Custom(value) => match lifetime {
                CacheLifetime::Custom(other) => Ok(value == &other),
                _ => {
                    log::error!("Found conflicting bindings");
                    Err(HtmlError::InternalServerError.new("Conflicting cache bindings"))
                }
            },
            _ => Ok(bind == &self.get_cache_bind(cache).await?),
        }
    }

    /// Drops every value bound to this lifetime by rotating its bind.
    pub async fn invalidate(&self, cache: &mut MultiplexedConnection) -> Result<(), Error> {
        if let Some(bind_key) = self.bind_key() {
            let bind = uuid::Uuid::new_v4().to_string();
            log::trace!("> Rotating {bind_key} to {bind}");
            set_cache_value(bind_key, bind, cache).await?;
        }
        Ok(())
    }
}

/// Cached value together with the bind it was stored under. Stored in redis
/// as a JSON string.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RedisValue<T> {
    pub value: T,
    _lifetime: CacheLifetime,
    _bind: Option<String>,
}

impl<T: Serialize + DeserializeOwned + Send + Sync + Clone> RedisValue<T> {
    async fn new(
        value: T,
        lifetime: CacheLifetime,
        cache: &mut MultiplexedConnection,
    ) -> Result<Self, Error> {
        let bind = lifetime.get_cache_bind(cache).await?;

        Ok(Self {
            value,
            _lifetime: lifetime,
            _bind: bind,
        })
    }

    async fn validate<K: ToString + Serialize>(
        &self,
        key: &CacheKey<K>,
        cache: &mut MultiplexedConnection,
    ) -> Result<bool, Error> {
        self._lifetime
            .validate_cache_bind(&self._bind, key.into(), cache)
            .await
    }

    /// Returns the cached value under `key`, or runs `callback` and caches
    /// its result. Values that fail to deserialize are deleted.
    pub async fn get_or<F, Fut, K>(
        key: CacheKey<K>,
        cache: &mut MultiplexedConnection,
        callback: F,
    ) -> Result<RedisValue<T>, Error>
    where
        K: ToString + Serialize + Clone + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, Error>> + Send,
    {
        let value = get_json_value::<RedisValue<T>>((&key).into(), cache)
            .await
            .unwrap_or_else(|_| {
                let mut c = cache.clone();
                let k = key.to_string();
                tokio::spawn(async move {
                    log::error!("> Failed to deserialize cached value. Deleting {}", &k);
                    if let Err(e) = delete_cache_value(k, &mut c).await {
                        log::error!("> Failed to delete cached value! {e}");
                    }
                });
                None
            });
        // * Cannot use .map(|| {...}) due to async closures
        let value = match value {
            Some(value) => {
                log::trace!("> Found {}", key);
                match value.validate(&key, cache).await? {
                    true => Some(value),
                    false => {
                        log::trace!("> Invalidated {}", key);
                        None
                    }
                }
            }
            None => None,
        };

        match value {
            Some(value) => Ok(value),
            None => {
                log::trace!("> Fetching {}", key);
                let value = callback().await?;
                let lifetime: CacheLifetime = (&key).into();
                let value = RedisValue::new(value, lifetime, cache).await?;

                set_json_value(String::from(&key), &value, cache).await?;

                Ok(value)
            }
        }
    }
}

// Cache - raw handlers

pub async fn set_json_value<V: Serialize>(
    key: String,
    value: &V,
    cache: &mut MultiplexedConnection,
) -> Result<(), Error> {
    let json = serde_json::to_string(value)
        .map_err(|e| CacheError::new(format!("Failed to serialize {key}: {e}")))?;

    set_cache_value(key, json, cache).await
}

pub async fn get_json_value<V: DeserializeOwned>(
    key: String,
    cache: &mut MultiplexedConnection,
) -> Result<Option<V>, Error> {
    match get_cache_value::<&str, String>(&key, cache).await? {
        Some(json) => serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| CacheError::new(format!("Failed to deserialize {key}: {e}")).into()),
        None => Ok(None),
    }
}

pub async fn set_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    cache: &mut MultiplexedConnection,
) -> Result<(), Error> {
    let _: () = cache.set(key, value).await.map_err(CacheError::from)?;

    Ok(())
}

pub async fn delete_cache_value<K: ToRedisArgs + Send + Sync>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<(), Error> {
    let _: () = cache.del(key).await.map_err(CacheError::from)?;

    Ok(())
}

pub async fn get_cache_value<K: ToRedisArgs + Send + Sync, V: FromRedisValue>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<Option<V>, Error> {
    let value: Option<V> = cache.get(key).await.map_err(CacheError::from)?;

    Ok(value)
}
