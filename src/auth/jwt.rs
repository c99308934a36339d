use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::claims::{Claims, Role};
use crate::{
    config::JwtConfig,
    error::{AppError, AppResult},
    state::AppState,
};

/// Used when `TOKEN_LIFETIME` is missing, unparsable or not positive.
pub const DEFAULT_LIFETIME: Duration = Duration::hours(24);

/// The only algorithm tokens are signed with or accepted under.
const ALGORITHM: Algorithm = Algorithm::HS256;

/// Issues and validates HS256 identity tokens with a secret fixed at startup.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl FromRef<AppState> for TokenService {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

impl TokenService {
    pub fn new(secret: &str, lifetime: Duration) -> AppResult<Self> {
        if secret.is_empty() {
            return Err(AppError::Config("JWT_SECRET is required".into()));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: positive_or_default(lifetime),
        })
    }

    pub fn from_config(cfg: &JwtConfig) -> AppResult<Self> {
        let lifetime = parse_lifetime(&cfg.token_lifetime).unwrap_or(DEFAULT_LIFETIME);
        Self::new(&cfg.secret, lifetime)
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn issue(&self, user_id: i64, role: Role) -> AppResult<String> {
        self.issue_with_lifetime(user_id, role, self.lifetime)
    }

    pub fn issue_with_lifetime(
        &self,
        user_id: i64,
        role: Role,
        lifetime: Duration,
    ) -> AppResult<String> {
        self.issue_at(user_id, role, lifetime, OffsetDateTime::now_utc())
    }

    fn issue_at(
        &self,
        user_id: i64,
        role: Role,
        lifetime: Duration,
        now: OffsetDateTime,
    ) -> AppResult<String> {
        let lifetime = positive_or_default(lifetime);
        let claims = Claims {
            user_id,
            role,
            iat: now.unix_timestamp(),
            exp: (now + lifetime).unix_timestamp(),
        };
        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding)
            .map_err(|e| anyhow::Error::new(e).context("sign jwt"))?;
        debug!(user_id, %role, "jwt signed");
        Ok(token)
    }

    pub fn validate(&self, token: &str) -> AppResult<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &validation()).map_err(|e| {
            debug!(reason = ?e.kind(), "jwt rejected");
            AppError::InvalidToken(e.to_string())
        })?;
        let claims = data.claims;

        // jsonwebtoken accepts exp == now; an expiry instant is already invalid here.
        let now = OffsetDateTime::now_utc().unix_timestamp();
        if claims.exp <= now || claims.exp <= claims.iat {
            return Err(AppError::InvalidToken("token expired".into()));
        }
        debug!(user_id = claims.user_id, role = %claims.role, "jwt verified");
        Ok(claims)
    }
}

fn validation() -> Validation {
    let mut validation = Validation::new(ALGORITHM);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "iat"]);
    validation
}

fn positive_or_default(lifetime: Duration) -> Duration {
    if lifetime.is_positive() {
        lifetime
    } else {
        DEFAULT_LIFETIME
    }
}

fn unit_nanos(unit: &str) -> Option<i64> {
    Some(match unit {
        "ns" => 1,
        "us" | "\u{b5}s" | "\u{3bc}s" => 1_000,
        "ms" => 1_000_000,
        "s" => 1_000_000_000,
        "m" => 60 * 1_000_000_000,
        "h" => 3_600 * 1_000_000_000,
        _ => return None,
    })
}

/// Parses durations: an optional sign, then one or more decimal
/// numbers with a unit (`ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`), e.g. `24h`,
/// `1.5h`, `1h30m` or `300us`. Returns `None` for anything else, for zero,
/// negative values and totals beyond `i64` nanoseconds.
pub fn parse_lifetime(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (negative, mut rest) = match raw.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    if rest.is_empty() {
        return None;
    }

    let mut total: i64 = 0;
    while !rest.is_empty() {
        let int_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let (int_part, after) = rest.split_at(int_len);
        let (frac_part, after) = match after.strip_prefix('.') {
            Some(f) => f.split_at(f.find(|c: char| !c.is_ascii_digit()).unwrap_or(f.len())),
            None => ("", after),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }

        let unit_len = after
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after.len());
        let (unit, after) = after.split_at(unit_len);
        let scale = unit_nanos(unit)?;

        let whole: i64 = if int_part.is_empty() { 0 } else { int_part.parse().ok()? };
        let mut part = whole.checked_mul(scale)?;
        // digits below one nanosecond are truncated
        let mut place = scale;
        for digit in frac_part.bytes() {
            place /= 10;
            if place == 0 {
                break;
            }
            part = part.checked_add(i64::from(digit - b'0') * place)?;
        }
        total = total.checked_add(part)?;
        rest = after;
    }

    let total = Duration::nanoseconds(total);
    (!negative && total.is_positive()).then_some(total)
}
