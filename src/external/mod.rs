pub mod collaborators;
pub mod ipo_provider;
pub mod kite_internal;
pub mod mf_nav_api;
pub mod nav_provider;
