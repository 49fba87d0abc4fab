// SPDX-License-Identifier: MIT

//! C7 NotificationBus (§4.7): real-time fan-out of newly sent messages to
//! subscribed clients, independent of the durable addressed audience.

pub mod bus;

pub use bus::NotificationBus;
