mod helpers;
mod mocks;
mod payments;
mod wallet;
mod webhook;
