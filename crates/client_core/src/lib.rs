pub mod api;
pub mod config;
pub mod dispatch;
pub mod login_flow;
pub mod lookup;
pub mod pipeline;
pub mod services;

pub use api::ApiService;
pub use config::{load_settings, LoginSettings};
pub use dispatch::{ui_channel, ChannelDispatcher, ImmediateDispatcher, UiDispatcher, UiQueue};
pub use login_flow::{
    LoginBindings, LoginDependencies, LoginFlowController, LoginFlowOptions, LoginInputs,
    LoginTriggered, ResolvedEnvironment,
};
pub use lookup::HttpEnvironmentLookup;
pub use services::{AuthService, EnvironmentLookup, LookupError};
