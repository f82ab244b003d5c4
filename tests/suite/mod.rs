mod auth;
mod chat_proxy;
mod pages;
