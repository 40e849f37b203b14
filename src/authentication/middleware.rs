use std::convert::Infallible;

use warp::{reject::Rejection, Filter};

use crate::constants::SESSION_COOKIE;

use super::jwt::{SessionData, SessionKey};

pub fn with_session(
    key: SessionKey,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::cookie::<String>(SESSION_COOKIE).and_then(move |session: String| {
        let key = key.clone();
        async move {
            key.verify_jwt_session(&session)
                .map(SessionData::from)
                .map_err(warp::reject::custom)
        }
    })
}

/// Like [`with_session`] but lets anonymous and expired sessions through
/// as `None`.
pub fn with_possible_session(
    key: SessionKey,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Infallible> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE).map(move |session: Option<String>| {
        session.and_then(|session| match key.verify_jwt_session(&session) {
            Ok(data) => Some(data.into()),
            Err(e) => {
                log::debug!("Ignoring session: {e}");
                None
            }
        })
    })
}
