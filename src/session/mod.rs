//! 会话校验模块
//!
//! 校验请求携带的 JWT，并确认其中的会话 token 是该用户当前唯一有效的登录

pub mod cache;
pub mod jwt;
pub mod middleware;

pub use cache::{MemorySessionCache, RedisSessionCache, SessionCache};
pub use middleware::{SessionGate, session_gate_middleware};
