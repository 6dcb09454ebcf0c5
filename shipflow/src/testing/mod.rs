//! Test doubles for the delivery collaborators.

mod mocks;

pub use mocks::{
    mock_collaborators, MockBuilder, MockDeployRepo, MockHandles, MockNotifier, MockRegistry,
    MockTestRunner, MockVersionResolver,
};
