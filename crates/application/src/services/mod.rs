mod chat_service;
mod token_service;
mod user_service;

pub use chat_service::{ChatService, ChatServiceDependencies, ChatWithSender};
pub use token_service::{
    Claims, IssuedToken, TokenService, TokenServiceDependencies, SESSION_MAX_AGE, TOKEN_LIFETIME,
};
pub use user_service::{
    RegisterUserRequest, UserService, UserServiceDependencies, MIN_PASSWORD_LEN,
};
