pub mod alias;
pub mod cli;
pub mod config;
pub mod external;
pub mod ial;
pub mod script;
pub mod strip;
