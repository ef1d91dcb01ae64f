//! Workspace state machine
//!
//! ```text
//! Empty --load--> Loaded(organize)
//! Loaded(m) --switch_mode--> Loaded(m')
//! Loaded(m) --commit ok--> Empty
//! Loaded(m) --commit failed--> Loaded(m)
//! Loaded(*) --clear--> Empty
//! ```
//!
//! Load and commit borrow the workspace mutably for the whole collaborator
//! call, so nothing else can touch the model while one is outstanding.

use crate::commit::reconcile;
use crate::error::WorkspaceError;
use crate::mode::{Gesture, ModeController};
use crate::reorder::{ClickOutcome, DropSide, ReorderEngine};
use crate::services::{
    DocumentHandle, PreviewPages, PreviewRequest, PreviewService, ServiceError, TransformEngine,
    TransformOutcome,
};
use crate::thumbnail::{project, ThumbnailLayout, ThumbnailView};
use page_model::{Mode, PageIndex, PageModel, PageModelError, Rotation, TransformRequest};
use std::path::{Path, PathBuf};

/// Change notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceEvent {
    Loaded { pages: usize },
    Cleared,
    ModeChanged { from: Mode, to: Mode },
    /// Flags or gesture marks of one page changed.
    PageChanged(PageIndex),
    /// Display order changed, provisionally during a drag or for good.
    OrderChanged,
    Committed { output_path: Option<PathBuf> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceState {
    Empty,
    Loaded(Mode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageClick {
    Move(ClickOutcome),
    Selection { page: PageIndex, selected: bool },
}

#[derive(Debug)]
struct Session {
    document: DocumentHandle,
    model: PageModel,
    controller: ModeController,
    reorder: ReorderEngine,
}

#[derive(Debug, Default)]
pub struct Workspace {
    session: Option<Session>,
    events: Vec<WorkspaceEvent>,
}

fn loaded(session: &mut Option<Session>) -> Result<&mut Session, WorkspaceError> {
    session.as_mut().ok_or(WorkspaceError::NoDocument)
}

fn require(session: &Session, gesture: Gesture) -> Result<(), WorkspaceError> {
    session.controller.require(gesture).map_err(|err| {
        log::warn!("refusing gesture: {err}");
        err
    })
}

fn refuse<T>(result: Result<T, PageModelError>) -> Result<T, WorkspaceError> {
    result.map_err(|err| {
        if matches!(err, PageModelError::UnknownPage(_) | PageModelError::InvalidRotation(_)) {
            log::warn!("refusing page mutation: {err}");
        }
        WorkspaceError::from(err)
    })
}

fn model_from_preview(pages: PreviewPages) -> Result<PageModel, WorkspaceError> {
    if pages.file_paths.is_empty() {
        return Err(PageModelError::EmptyDocument.into());
    }

    if pages.file_paths.len() != pages.page_count as usize {
        return Err(ServiceError::Rejected(format!(
            "preview returned {} images for {} pages",
            pages.file_paths.len(),
            pages.page_count
        ))
        .into());
    }

    Ok(PageModel::from_images(pages.file_paths)?)
}

fn render_single_page<P>(
    preview: &mut P,
    document: &DocumentHandle,
    page: PageIndex,
) -> Result<(PathBuf, u32), WorkspaceError>
where
    P: PreviewService + ?Sized,
{
    let pages = preview.render(document, PreviewRequest::Page(page))?;
    let page_count = pages.page_count;
    let [image]: [PathBuf; 1] = pages.file_paths.try_into().map_err(|paths: Vec<PathBuf>| {
        ServiceError::Rejected(format!(
            "preview of page {page} returned {} images, expected one",
            paths.len()
        ))
    })?;

    Ok((image, page_count))
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> WorkspaceState {
        match &self.session {
            Some(session) => WorkspaceState::Loaded(session.controller.mode()),
            None => WorkspaceState::Empty,
        }
    }

    pub fn document(&self) -> Option<&DocumentHandle> {
        self.session.as_ref().map(|session| &session.document)
    }

    pub fn model(&self) -> Option<&PageModel> {
        self.session.as_ref().map(|session| &session.model)
    }

    pub fn mode(&self) -> Option<Mode> {
        self.session.as_ref().map(|session| session.controller.mode())
    }

    pub fn pending_move(&self) -> Option<PageIndex> {
        self.session.as_ref().and_then(|session| session.reorder.pending_move())
    }

    /// Loads `document` from one all-pages preview. Prior state is discarded
    /// first, and a failed preview leaves the workspace empty.
    pub fn load<P>(&mut self, document: DocumentHandle, preview: &mut P) -> Result<usize, WorkspaceError>
    where
        P: PreviewService + ?Sized,
    {
        self.clear();

        log::debug!("requesting preview of all pages for {document}");
        let pages = preview.render(&document, PreviewRequest::AllPages).map_err(|err| {
            log::warn!("preview of {document} failed: {err}");
            WorkspaceError::from(err)
        })?;
        let model = model_from_preview(pages)?;

        Ok(self.install(document, model))
    }

    /// Loads `document` one page at a time. Page 1 reports the page count; the
    /// remaining pages are requested and applied strictly in increasing order.
    /// Any failing page aborts the load and leaves the workspace empty.
    pub fn load_paginated<P>(
        &mut self,
        document: DocumentHandle,
        preview: &mut P,
    ) -> Result<usize, WorkspaceError>
    where
        P: PreviewService + ?Sized,
    {
        self.clear();

        let (first, page_count) = render_single_page(preview, &document, PageIndex(1))?;
        if page_count == 0 {
            return Err(PageModelError::EmptyDocument.into());
        }

        // The count is untrusted until every page has agreed on it.
        let mut images = vec![first];
        for page in 2..=page_count {
            let (image, reported) = render_single_page(preview, &document, PageIndex(page)).map_err(|err| {
                log::warn!("preview of page {page} of {document} failed: {err}");
                err
            })?;
            if reported != page_count {
                log::warn!("page {page} of {document} reported {reported} pages, page 1 reported {page_count}");
                return Err(ServiceError::Rejected(format!(
                    "preview of page {page} reported {reported} pages, expected {page_count}"
                ))
                .into());
            }
            images.push(image);
        }

        let model = PageModel::from_images(images)?;
        Ok(self.install(document, model))
    }

    fn install(&mut self, document: DocumentHandle, model: PageModel) -> usize {
        let pages = model.len();
        log::debug!("loaded {document} with {pages} pages");

        self.session = Some(Session {
            document,
            model,
            controller: ModeController::new(),
            reorder: ReorderEngine::new(),
        });
        self.events.push(WorkspaceEvent::Loaded { pages });
        pages
    }

    pub fn clear(&mut self) {
        if self.session.take().is_some() {
            self.events.push(WorkspaceEvent::Cleared);
        }
    }

    /// Switches mode. Selection and any move or drag in progress are dropped;
    /// deletions, rotations and order are kept.
    pub fn switch_mode(&mut self, mode: Mode) -> Result<(), WorkspaceError> {
        let session = loaded(&mut self.session)?;
        let from = session.controller.switch(mode);
        session.model.clear_selection();
        session.reorder.abandon();

        log::debug!("mode {from} -> {mode}");
        self.events.push(WorkspaceEvent::ModeChanged { from, to: mode });
        Ok(())
    }

    pub fn toggle_deleted(&mut self, page: PageIndex) -> Result<bool, WorkspaceError> {
        let session = loaded(&mut self.session)?;
        require(session, Gesture::ToggleDelete)?;
        let deleted = refuse(session.model.toggle_deleted(page))?;

        self.events.push(WorkspaceEvent::PageChanged(page));
        Ok(deleted)
    }

    /// A click on a page body: click-to-move in organize mode, selection otherwise.
    pub fn click_page(&mut self, page: PageIndex) -> Result<PageClick, WorkspaceError> {
        let session = loaded(&mut self.session)?;
        if session.controller.mode() != Mode::Organize {
            return self.toggle_selected(page).map(|selected| PageClick::Selection { page, selected });
        }

        require(session, Gesture::ClickToMove)?;
        let outcome = refuse(session.reorder.click(&mut session.model, page))?;

        match outcome {
            ClickOutcome::Moved { source, .. } => {
                self.events.push(WorkspaceEvent::PageChanged(source));
                self.events.push(WorkspaceEvent::OrderChanged);
            }
            ClickOutcome::Armed(page) | ClickOutcome::Cancelled(page) => {
                self.events.push(WorkspaceEvent::PageChanged(page));
            }
        }
        Ok(PageClick::Move(outcome))
    }

    pub fn toggle_selected(&mut self, page: PageIndex) -> Result<bool, WorkspaceError> {
        let session = loaded(&mut self.session)?;
        require(session, Gesture::ToggleSelect)?;
        let selected = refuse(session.model.toggle_selected(page))?;

        self.events.push(WorkspaceEvent::PageChanged(page));
        Ok(selected)
    }

    /// Replaces the display order directly (organize mode).
    pub fn reorder(&mut self, order: &[PageIndex]) -> Result<(), WorkspaceError> {
        let session = loaded(&mut self.session)?;
        require(session, Gesture::Drag)?;
        session.model.reorder(order)?;
        session.reorder.abandon();

        log::debug!("page order set to {order:?}");
        self.events.push(WorkspaceEvent::OrderChanged);
        Ok(())
    }

    pub fn begin_drag(&mut self, page: PageIndex) -> Result<(), WorkspaceError> {
        let session = loaded(&mut self.session)?;
        require(session, Gesture::Drag)?;
        refuse(session.reorder.begin_drag(&session.model, page))?;

        self.events.push(WorkspaceEvent::PageChanged(page));
        Ok(())
    }

    /// Pointer over `target` during a drag. Returns whether the provisional order changed.
    pub fn drag_over(&mut self, target: PageIndex, side: DropSide) -> Result<bool, WorkspaceError> {
        let session = loaded(&mut self.session)?;
        require(session, Gesture::Drag)?;
        if !session.model.contains(target) {
            return refuse(Err(PageModelError::UnknownPage(target)));
        }

        let changed = session.reorder.drag_over(target, side);
        if changed {
            self.events.push(WorkspaceEvent::OrderChanged);
        }
        Ok(changed)
    }

    /// Pointer position (content coordinates) during a drag.
    pub fn drag_to_point(
        &mut self,
        layout: &ThumbnailLayout,
        x: f32,
        y: f32,
    ) -> Result<bool, WorkspaceError> {
        let session = loaded(&mut self.session)?;
        let order = match session.reorder.provisional_order() {
            Some(order) => order.to_vec(),
            None => session.model.current_order(),
        };

        let Some(hit) = layout.hit_test(x, y, order.len()) else {
            return Ok(false);
        };

        self.drag_over(order[hit.position], DropSide::from_fraction(hit.fraction))
    }

    /// Releases the drag and commits its order. Returns whether the order changed.
    pub fn end_drag(&mut self) -> Result<bool, WorkspaceError> {
        let session = loaded(&mut self.session)?;
        let dragged = session.reorder.drag().map(|drag| drag.dragged());
        let changed = session.reorder.end_drag(&mut session.model)?;

        if let Some(page) = dragged {
            self.events.push(WorkspaceEvent::PageChanged(page));
        }
        if changed {
            log::debug!("drag of {dragged:?} committed");
            self.events.push(WorkspaceEvent::OrderChanged);
        }
        Ok(changed)
    }

    pub fn apply_rotation(&mut self, page: PageIndex, delta: i32) -> Result<Rotation, WorkspaceError> {
        let session = loaded(&mut self.session)?;
        require(session, Gesture::Rotate)?;
        let rotation = refuse(session.model.apply_rotation(page, delta))?;

        self.events.push(WorkspaceEvent::PageChanged(page));
        Ok(rotation)
    }

    /// Adds `delta` to every selected page. Selection is kept.
    pub fn rotate_selection(&mut self, delta: i32) -> Result<Vec<PageIndex>, WorkspaceError> {
        let session = loaded(&mut self.session)?;
        require(session, Gesture::Rotate)?;
        refuse(Rotation::NONE.rotated_by(delta))?;

        let selected: Vec<PageIndex> = session.model.selected_indexes().into_iter().collect();
        if selected.is_empty() {
            return Err(WorkspaceError::NoSelection);
        }

        for page in &selected {
            refuse(session.model.apply_rotation(*page, delta))?;
            self.events.push(WorkspaceEvent::PageChanged(*page));
        }
        Ok(selected)
    }

    pub fn commit_enabled(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.controller.commit_enabled(&session.model))
    }

    pub fn commit_label(&self) -> Option<&'static str> {
        self.mode().map(Mode::commit_label)
    }

    pub fn hint(&self) -> Option<String> {
        self.session.as_ref().map(|session| {
            session.controller.hint(&session.model, session.reorder.pending_move().is_some())
        })
    }

    pub fn thumbnails(&self) -> Vec<ThumbnailView> {
        match &self.session {
            Some(session) => project(&session.model, session.controller.mode(), &session.reorder),
            None => Vec::new(),
        }
    }

    /// The request a commit would send. Fails without any external call.
    pub fn prepare_commit(&self) -> Result<TransformRequest, WorkspaceError> {
        let session = self.session.as_ref().ok_or(WorkspaceError::NoDocument)?;
        reconcile(&session.model, session.controller.mode())
    }

    /// Sends the reconciled request to `engine`. Success resets the workspace;
    /// failure keeps every edit so the user can retry.
    pub fn commit<E>(
        &mut self,
        engine: &mut E,
        destination: &Path,
    ) -> Result<TransformOutcome, WorkspaceError>
    where
        E: TransformEngine + ?Sized,
    {
        let request = self.prepare_commit()?;
        let document = self.document().cloned().ok_or(WorkspaceError::NoDocument)?;

        log::debug!("dispatching {} for {document}", request.mode());
        match engine.invoke(&document, &request, destination) {
            Ok(outcome) => {
                self.session = None;
                self.events.push(WorkspaceEvent::Committed { output_path: outcome.output_path.clone() });
                Ok(outcome)
            }
            Err(err) => {
                log::warn!("{} of {document} failed: {err}", request.mode());
                Err(err.into())
            }
        }
    }

    pub fn drain_events(&mut self) -> Vec<WorkspaceEvent> {
        std::mem::take(&mut self.events)
    }
}
