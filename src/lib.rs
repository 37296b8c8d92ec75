/*
 *  lib.rs
 *
 *  vestamon - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Split-flap board monitor - codec, models, composer, renderer and
 *  the per-board display coordinator
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

pub mod charset;
pub mod compose;
pub mod config;
pub mod coordinator;
pub mod device;
pub mod grid;
pub mod model;
pub mod publish;
pub mod render;
pub mod service;
pub mod vbml;

pub use compose::{Align, ComposeError, Composer, Justify};
pub use coordinator::{BoardSnapshot, Coordinator, CoordinatorError, QuietHours, WriteOutcome};
pub use device::{BoardDevice, DeviceError, LocalClient, MockBoard, WriteOptions};
pub use grid::CharacterGrid;
pub use model::{DeviceModel, ModelError};
pub use render::{ImageFormat, RenderedImage, Renderer};
pub use service::{BoardRegistry, MessageRequest, ServiceError};
