mod helpers;
mod orders;
mod redirects;
mod triggers;
mod webhooks;
