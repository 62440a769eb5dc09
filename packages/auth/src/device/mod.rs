// ABOUTME: Device authorization grant, both halves
// ABOUTME: CLI-side polling client and the server-side code store

pub mod client;
pub mod store;
pub mod types;

pub use client::DeviceFlowClient;
pub use store::DeviceAuthStore;
pub use types::{
    DeviceCodePoll, DeviceCodeRecord, DeviceCodeRequest, DeviceCodeResponse, DeviceCodeStatus,
    DeviceTokenResponse,
};
