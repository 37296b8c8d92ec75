/*
 *  service.rs
 *
 *  vestamon - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Board registry and the send-message command surface
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

use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::compose::{Align, ComposeError, Composer, Justify};
use crate::coordinator::{Coordinator, CoordinatorError, WriteOutcome};
use crate::device::{BoardDevice, WriteOptions};
use crate::grid::CharacterGrid;
use crate::model::DeviceModel;
use crate::vbml::{Vbml, VbmlClient, VbmlError};

/// Accepted temporary message durations, seconds.
pub const DURATION_RANGE: RangeInclusive<u64> = 10..=7200;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("unknown board '{0}'")]
    UnknownDevice(String),
    #[error("cannot compose message: {0}")]
    Compose(#[from] ComposeError),
    #[error(transparent)]
    Vbml(#[from] VbmlError),
    #[error("board '{id}': {source}")]
    Board {
        id: String,
        #[source]
        source: CoordinatorError,
    },
}

/// One send-message call.
#[derive(Debug, Clone, Default)]
pub struct MessageRequest {
    pub device_ids: Vec<String>,
    pub message: Option<String>,
    pub justify: Justify,
    pub align: Align,
    pub vbml: Option<Vbml>,
    /// temporary for this many seconds when set
    pub duration: Option<u64>,
    pub options: Option<WriteOptions>,
}

impl MessageRequest {
    pub fn text(device_ids: Vec<String>, message: &str) -> Self {
        MessageRequest {
            device_ids,
            message: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.device_ids.is_empty() {
            return Err(ServiceError::InvalidRequest("no target boards".into()));
        }
        if self.message.is_none() && self.vbml.is_none() {
            return Err(ServiceError::InvalidRequest("a message or a vbml document is required".into()));
        }
        if let Some(secs) = self.duration {
            if !DURATION_RANGE.contains(&secs) {
                return Err(ServiceError::InvalidRequest(format!(
                    "duration {}s outside {}-{}s",
                    secs,
                    DURATION_RANGE.start(),
                    DURATION_RANGE.end()
                )));
            }
        }
        Ok(())
    }
}

/// Coordinators by board id, plus the optional composition service.
pub struct BoardRegistry<D: BoardDevice> {
    boards: BTreeMap<String, Arc<Coordinator<D>>>,
    vbml: Option<VbmlClient>,
}

impl<D: BoardDevice + 'static> BoardRegistry<D> {
    pub fn new(vbml: Option<VbmlClient>) -> Self {
        BoardRegistry {
            boards: BTreeMap::new(),
            vbml,
        }
    }

    pub fn insert(&mut self, coordinator: Arc<Coordinator<D>>) {
        self.boards.insert(coordinator.id().to_string(), coordinator);
    }

    pub fn get(&self, id: &str) -> Result<&Arc<Coordinator<D>>, ServiceError> {
        self.boards
            .get(id)
            .ok_or_else(|| ServiceError::UnknownDevice(id.to_string()))
    }

    pub fn ids(&self) -> Vec<String> {
        self.boards.keys().cloned().collect()
    }

    pub fn coordinators(&self) -> impl Iterator<Item = &Arc<Coordinator<D>>> {
        self.boards.values()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }

    /// Compose once per model, then write to every target. Nothing is written
    /// unless every target resolves and every grid composes.
    pub async fn send_message(
        &self,
        request: &MessageRequest,
    ) -> Result<Vec<(String, WriteOutcome)>, ServiceError> {
        request.validate()?;

        let targets = request
            .device_ids
            .iter()
            .map(|id| self.get(id).map(Arc::clone))
            .collect::<Result<Vec<_>, _>>()?;

        let mut grids: HashMap<&'static str, CharacterGrid> = HashMap::new();
        for coordinator in &targets {
            let model = coordinator.renderer().model();
            if !grids.contains_key(model.name) {
                let grid = self.compose_for(model, request).await?;
                grids.insert(model.name, grid);
            }
        }

        let mut outcomes = Vec::with_capacity(targets.len());
        for coordinator in targets {
            let grid = grids
                .get(coordinator.renderer().model().name)
                .cloned()
                .unwrap_or_default();
            let options = request.options.as_ref();
            let result = match request.duration {
                Some(secs) => {
                    coordinator
                        .write_temporary(grid, Duration::from_secs(secs), options)
                        .await
                }
                None => coordinator.write_persistent(grid, options).await,
            };
            let outcome = result.map_err(|source| ServiceError::Board {
                id: coordinator.id().to_string(),
                source,
            })?;
            debug!("[{}] send_message: {:?}", coordinator.id(), outcome);
            outcomes.push((coordinator.id().to_string(), outcome));
        }
        Ok(outcomes)
    }

    /// End temporary messages on the given boards, or all when empty.
    pub async fn clear_temporary(&self, device_ids: &[String]) -> Result<Vec<(String, bool)>, ServiceError> {
        let targets = if device_ids.is_empty() {
            self.boards.values().cloned().collect::<Vec<_>>()
        } else {
            device_ids
                .iter()
                .map(|id| self.get(id).map(Arc::clone))
                .collect::<Result<Vec<_>, _>>()?
        };
        let mut cleared = Vec::with_capacity(targets.len());
        for coordinator in targets {
            cleared.push((coordinator.id().to_string(), coordinator.clear_temporary().await));
        }
        Ok(cleared)
    }

    async fn compose_for(
        &self,
        model: &'static DeviceModel,
        request: &MessageRequest,
    ) -> Result<CharacterGrid, ServiceError> {
        if let Some(doc) = &request.vbml {
            return Ok(self.vbml_client()?.compose(doc).await?);
        }

        let text = request.message.as_deref().unwrap_or_default();
        match Composer::new(model).compose(text, request.justify, request.align) {
            Ok(grid) => Ok(grid),
            Err(e) if e.wants_layout_service() && self.vbml.is_some() => {
                warn!("{} board cannot lay out message directly ({}), trying VBML", model.name, e);
                let mut doc = Vbml::from_template(text, request.justify, request.align);
                if let Some(style) = doc.components[0].style.as_mut() {
                    style.height = u8::try_from(model.rows).ok();
                    style.width = u8::try_from(model.columns).ok();
                }
                let grid = self.vbml_client()?.compose(&doc).await?;
                info!("message composed by VBML for {} board", model.name);
                Ok(grid)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn vbml_client(&self) -> Result<&VbmlClient, ServiceError> {
        self.vbml
            .as_ref()
            .ok_or_else(|| ServiceError::InvalidRequest("no VBML service configured".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MockBoard;
    use crate::model::{FLAGSHIP_BLACK, NOTE};
    use crate::render::{ImageFormat, Renderer};

    fn registry() -> (BoardRegistry<MockBoard>, MockBoard, MockBoard) {
        let big = MockBoard::showing(CharacterGrid::filled(6, 22, 0));
        let small = MockBoard::showing(CharacterGrid::filled(3, 15, 0));
        let mut reg = BoardRegistry::new(None);
        reg.insert(Coordinator::new("big", big.clone(), Renderer::new(&FLAGSHIP_BLACK, ImageFormat::Svg, 0)));
        reg.insert(Coordinator::new("small", small.clone(), Renderer::new(&NOTE, ImageFormat::Svg, 0)));
        (reg, big, small)
    }

    #[test]
    fn test_request_validation() {
        assert!(MessageRequest::default().validate().is_err());
        assert!(MessageRequest { device_ids: vec!["a".into()], ..Default::default() }.validate().is_err());

        let mut req = MessageRequest::text(vec!["a".into()], "hi");
        assert!(req.validate().is_ok());
        req.duration = Some(9);
        assert!(req.validate().is_err());
        req.duration = Some(7200);
        assert!(req.validate().is_ok());
        req.duration = Some(7201);
        assert!(req.validate().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_composes_per_model() {
        let (reg, big, small) = registry();
        let req = MessageRequest::text(vec!["big".into(), "small".into()], "hello");
        let outcomes = reg.send_message(&req).await.unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|(_, o)| *o == WriteOutcome::Written));

        assert_eq!(big.current().unwrap().column_count(), 22);
        assert_eq!(small.current().unwrap().row_count(), 3);
        assert_eq!(small.current().unwrap().get(1, 5), Some(8)); // H
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_board_writes_nothing() {
        let (reg, big, _) = registry();
        let req = MessageRequest::text(vec!["big".into(), "attic".into()], "hello");
        assert!(matches!(reg.send_message(&req).await, Err(ServiceError::UnknownDevice(id)) if id == "attic"));
        assert_eq!(big.write_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_uncomposable_without_vbml_is_rejected() {
        let (reg, big, _) = registry();
        let req = MessageRequest::text(vec!["big".into()], "supercalifragilisticexpialidocious");
        assert!(matches!(
            reg.send_message(&req).await,
            Err(ServiceError::Compose(ComposeError::WordTooLong { .. }))
        ));

        let vbml = MessageRequest {
            device_ids: vec!["big".into()],
            vbml: Some(Vbml::from_template("x", Justify::Center, Align::Center)),
            ..Default::default()
        };
        assert!(matches!(reg.send_message(&vbml).await, Err(ServiceError::InvalidRequest(_))));
        assert_eq!(big.write_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duration_selects_temporary() {
        let (reg, _, small) = registry();
        let coord = reg.get("small").unwrap().clone();
        coord.refresh().await.unwrap();

        let mut req = MessageRequest::text(vec!["small".into()], "ring");
        req.duration = Some(10);
        reg.send_message(&req).await.unwrap();
        assert!(coord.snapshot().temporary_active);

        let cleared = reg.clear_temporary(&[]).await.unwrap();
        assert!(cleared.contains(&("small".to_string(), true)));
        assert!(cleared.contains(&("big".to_string(), false)));
        assert_eq!(small.current(), Some(CharacterGrid::filled(3, 15, 0)));
    }
}
