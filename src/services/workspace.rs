//! Authoritative board state of one variant.
//!
//! Cards live in a single map keyed by id; the card's `board` field is its only
//! membership record and the per-column arrays are derived from it. Positions
//! inside a board are kept gap-free (`0..n`) by every mutation.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use im::OrdMap;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::models::board::{Board, BoardKind, BoardVariant, BoardView, RESERVED_BOARD_NAMES};
use crate::models::card::{
    ActivityEntry, ActivityKind, Attachment, Card, Comment, CreateCardRequest, DragLocation,
    DropTarget, PendingItem, TaskItem, TaskQuery, UpdateCardRequest,
};
use crate::models::field::{is_protected, CreateFieldRequest, FieldConfig, UpdateFieldRequest};
use crate::repository::WorkspaceSnapshot;
use crate::services::defaults;
use crate::services::schema::{validate_definition, FormSchema};
use crate::services::{BoardError, BoardResult};

/// The user performing a mutation.
#[derive(Debug, Clone)]
pub struct Actor {
    pub username: String,
    pub is_admin: bool,
}

impl Actor {
    pub fn new(username: &str, is_admin: bool) -> Self {
        Self {
            username: username.to_string(),
            is_admin,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Workspace {
    variant: BoardVariant,
    boards: Vec<Board>,
    cards: OrdMap<String, Card>,
    fields: Vec<FieldConfig>,
    schema: Arc<FormSchema>,
    revision: u64,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn clean_members(members: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    members
        .iter()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty() && seen.insert(m.to_string()))
        .map(str::to_string)
        .collect()
}

fn clean_name(name: &str, what: &str) -> BoardResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(BoardError::Invalid(format!("{} is required", what)));
    }
    Ok(name.to_string())
}

impl Workspace {
    /// Fresh workspace with the default boards and fields.
    pub fn new(variant: BoardVariant) -> Self {
        let fields = defaults::fields(variant);
        Self {
            variant,
            boards: defaults::boards(),
            cards: OrdMap::new(),
            schema: Arc::new(FormSchema::build(&fields)),
            fields,
            revision: 0,
        }
    }

    /// Rebuilds a workspace from storage, repairing placements that do not
    /// satisfy the board invariants.
    pub fn from_snapshot(variant: BoardVariant, snapshot: WorkspaceSnapshot) -> Self {
        let mut ws = Self::new(variant);
        if !snapshot.boards.is_empty() {
            ws.boards = snapshot.boards;
        }
        if !snapshot.fields.is_empty() {
            ws.set_fields(snapshot.fields);
        }
        ws.revision = snapshot.revision;

        let fallback = ws.first_regular().ok();
        for mut card in snapshot.cards {
            if ws.board(&card.board).is_none() {
                match &fallback {
                    Some(board) => {
                        log::warn!(
                            "Card {} references unknown board '{}', moving it to '{}'",
                            card.id, card.board, board
                        );
                        card.board = board.clone();
                        card.position = usize::MAX;
                    }
                    None => {
                        log::error!("Dropping card {}: no regular board to hold it", card.id);
                        continue;
                    }
                }
            }
            ws.cards.insert(card.id.clone(), card);
        }

        let names: Vec<String> = ws.boards.iter().map(|b| b.name.clone()).collect();
        for name in names {
            let ids = ws.lane_ids(&name);
            ws.write_positions(&name, &ids);
        }
        ws
    }

    pub fn to_snapshot(&self) -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            boards: self.boards.clone(),
            cards: self.cards.values().cloned().collect(),
            fields: self.fields.clone(),
            revision: self.revision,
        }
    }

    pub fn variant(&self) -> BoardVariant {
        self.variant
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn bump_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    pub fn boards(&self) -> &[Board] {
        &self.boards
    }

    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.cards.values()
    }

    pub(crate) fn card_map(&self) -> &OrdMap<String, Card> {
        &self.cards
    }

    pub fn fields(&self) -> Vec<FieldConfig> {
        let mut fields = self.fields.clone();
        fields.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.field_name.cmp(&b.field_name)));
        fields
    }

    pub(crate) fn raw_fields(&self) -> &[FieldConfig] {
        &self.fields
    }

    pub fn schema(&self) -> Arc<FormSchema> {
        Arc::clone(&self.schema)
    }

    pub fn card(&self, id: &str) -> BoardResult<&Card> {
        self.cards
            .get(id)
            .ok_or_else(|| BoardError::CardNotFound(id.to_string()))
    }

    pub fn board(&self, name: &str) -> Option<&Board> {
        self.boards.iter().find(|b| b.name == name)
    }

    fn board_mut(&mut self, name: &str) -> BoardResult<&mut Board> {
        self.boards
            .iter_mut()
            .find(|b| b.name == name)
            .ok_or_else(|| BoardError::BoardNotFound(name.to_string()))
    }

    fn boards_of(&self, pred: impl Fn(BoardKind) -> bool) -> Vec<&Board> {
        let mut boards: Vec<&Board> = self.boards.iter().filter(|b| pred(b.kind)).collect();
        boards.sort_by_key(|b| b.position);
        boards
    }

    pub fn regular_boards(&self) -> Vec<&Board> {
        self.boards_of(|k| k == BoardKind::Regular)
    }

    pub fn finalized_boards(&self) -> Vec<&Board> {
        self.boards_of(|k| k.is_finalized())
    }

    fn board_of_kind(&self, kind: BoardKind) -> BoardResult<String> {
        self.boards
            .iter()
            .find(|b| b.kind == kind)
            .map(|b| b.name.clone())
            .ok_or_else(|| BoardError::BoardNotFound(kind.as_str().to_string()))
    }

    fn first_regular(&self) -> BoardResult<String> {
        self.regular_boards()
            .first()
            .map(|b| b.name.clone())
            .ok_or_else(|| BoardError::Invalid("There is no regular board".to_string()))
    }

    fn require_regular(&self, name: &str) -> BoardResult<()> {
        match self.board(name) {
            None => Err(BoardError::BoardNotFound(name.to_string())),
            Some(b) if b.kind != BoardKind::Regular => Err(BoardError::Invalid(format!(
                "Board '{}' is a {} board; use the complete, cancel or trash actions instead",
                name,
                b.kind.as_str()
            ))),
            Some(_) => Ok(()),
        }
    }

    pub fn kind_of(&self, card: &Card) -> BoardKind {
        self.board(&card.board).map(|b| b.kind).unwrap_or(BoardKind::Regular)
    }

    /// Cards of one board in display order.
    pub fn lane(&self, board: &str) -> Vec<&Card> {
        let mut lane: Vec<&Card> = self.cards.values().filter(|c| c.board == board).collect();
        lane.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.created_at.cmp(&b.created_at)));
        lane
    }

    fn lane_ids(&self, board: &str) -> Vec<String> {
        self.lane(board).into_iter().map(|c| c.id.clone()).collect()
    }

    fn write_positions(&mut self, board: &str, ids: &[String]) {
        for (index, id) in ids.iter().enumerate() {
            if let Some(card) = self.cards.get_mut(id.as_str()) {
                if card.position != index || card.board != board {
                    card.position = index;
                    card.board = board.to_string();
                }
            }
        }
    }

    /// Moves a card to `index` of `to` (end of the lane when `None` or past it).
    fn place(&mut self, id: &str, to: &str, index: Option<usize>) -> BoardResult<()> {
        let from = self.card(id)?.board.clone();
        let mut source = self.lane_ids(&from);
        source.retain(|c| c != id);

        if from == to {
            let at = index.unwrap_or(source.len()).min(source.len());
            source.insert(at, id.to_string());
            self.write_positions(to, &source);
        } else {
            self.write_positions(&from, &source);
            let mut target = self.lane_ids(to);
            let at = index.unwrap_or(target.len()).min(target.len());
            target.insert(at, id.to_string());
            self.write_positions(to, &target);
        }
        Ok(())
    }

    fn record(
        &mut self,
        id: &str,
        actor: &Actor,
        kind: ActivityKind,
        message: String,
        boards: Option<(String, String)>,
    ) -> BoardResult<Card> {
        let card = self
            .cards
            .get_mut(id)
            .ok_or_else(|| BoardError::CardNotFound(id.to_string()))?;
        let now = Utc::now();
        let (from_board, to_board) = match boards {
            Some((from, to)) => (Some(from), Some(to)),
            None => (None, None),
        };
        card.activity.push(ActivityEntry {
            id: new_id(),
            kind,
            actor: actor.username.clone(),
            message,
            from_board,
            to_board,
            at: now,
        });
        card.version += 1;
        card.updated_at = now;
        Ok(card.clone())
    }

    fn next_project_id(&self) -> String {
        let prefix = self.variant.project_prefix();
        let used: HashSet<u64> = self
            .cards
            .values()
            .filter_map(|c| c.project_id.strip_prefix(prefix)?.strip_prefix('-')?.parse().ok())
            .collect();
        let mut n = 1;
        while used.contains(&n) {
            n += 1;
        }
        format!("{}-{}", prefix, n)
    }

    fn editable_card(&self, id: &str) -> BoardResult<&Card> {
        let card = self.card(id)?;
        if self.kind_of(card) == BoardKind::Trash {
            return Err(BoardError::Invalid(format!(
                "Card {} is in the trash; restore it first",
                card.project_id
            )));
        }
        Ok(card)
    }

    // ── Cards ─────────────────────────────────────────────────────────

    pub fn create_card(&mut self, req: CreateCardRequest, actor: &Actor) -> BoardResult<Card> {
        let name = clean_name(&req.name, "Name")?;
        let board = match req.board {
            Some(board) => board,
            None => self.first_regular()?,
        };
        self.require_regular(&board)?;

        let mut values = req.fields;
        if self.schema.get("name").is_some() {
            values.insert("name".to_string(), Value::String(name.clone()));
        }
        let mut fields = self.schema.validate_all(&values)?;
        fields.remove("name");

        let now = Utc::now();
        let id = new_id();
        let card = Card {
            id: id.clone(),
            project_id: self.next_project_id(),
            name,
            position: self.lane(&board).len(),
            board: board.clone(),
            members: clean_members(&req.members),
            comments: Vec::new(),
            attachments: Vec::new(),
            pending_items: Vec::new(),
            activity: Vec::new(),
            fields,
            created_at: now,
            updated_at: now,
            completed_at: None,
            last_active_board: None,
            version: 0,
        };
        let project_id = card.project_id.clone();
        self.cards.insert(id.clone(), card);
        self.record(&id, actor, ActivityKind::Created, format!("Created {} in {}", project_id, board), None)
    }

    pub fn update_card(&mut self, id: &str, req: UpdateCardRequest, actor: &Actor) -> BoardResult<Card> {
        let card = self.editable_card(id)?;
        if let Some(expected) = req.expected_version {
            if expected != card.version {
                return Err(BoardError::Conflict(format!(
                    "Card {} was modified by someone else (version {}, expected {})",
                    card.project_id, card.version, expected
                )));
            }
        }

        let mut changed = Vec::new();
        let name = match req.name {
            Some(name) => {
                let name = clean_name(&name, "Name")?;
                if self.schema.get("name").is_some() {
                    let mut check = Map::new();
                    check.insert("name".to_string(), Value::String(name.clone()));
                    self.schema.validate_partial(&check)?;
                }
                (name != card.name).then_some(name)
            }
            None => None,
        };
        let fields = match req.fields {
            Some(mut values) => {
                values.remove("name");
                let normalized = self.schema.validate_partial(&values)?;
                let diff: Map<String, Value> = normalized
                    .into_iter()
                    .filter(|(k, v)| card.fields.get(k) != Some(v))
                    .collect();
                (!diff.is_empty()).then_some(diff)
            }
            None => None,
        };
        let members = req
            .members
            .map(|m| clean_members(&m))
            .filter(|m| *m != card.members);

        let card = self
            .cards
            .get_mut(id)
            .ok_or_else(|| BoardError::CardNotFound(id.to_string()))?;
        if let Some(name) = name {
            card.name = name;
            changed.push("name".to_string());
        }
        if let Some(fields) = fields {
            for (key, value) in fields {
                changed.push(key.clone());
                card.fields.insert(key, value);
            }
        }
        if let Some(members) = members {
            card.members = members;
            changed.push("members".to_string());
        }

        if changed.is_empty() {
            return Ok(card.clone());
        }
        self.record(id, actor, ActivityKind::Updated, format!("Updated {}", changed.join(", ")), None)
    }

    /// Drag-and-drop move inside or between regular boards.
    pub fn move_card(&mut self, id: &str, to: &str, index: usize, actor: &Actor) -> BoardResult<Card> {
        let card = self.card(id)?;
        let from = card.board.clone();
        self.require_regular(&from).map_err(|_| {
            BoardError::Invalid(format!("Card {} must be restored before it can be moved", card.project_id))
        })?;
        self.require_regular(to)?;

        if from == to && card.position == index.min(self.lane(to).len().saturating_sub(1)) {
            return Ok(card.clone());
        }

        self.place(id, to, Some(index))?;
        if from == to {
            return self.card(id).cloned();
        }
        self.record(
            id,
            actor,
            ActivityKind::Moved,
            format!("Moved from {} to {}", from, to),
            Some((from, to.to_string())),
        )
    }

    /// Applies a drop from the board UI. A stale `source` means the card was
    /// moved by someone else since the drag started.
    pub fn drop_card(
        &mut self,
        id: &str,
        source: Option<&DragLocation>,
        target: DropTarget,
        actor: &Actor,
    ) -> BoardResult<Card> {
        let card = self.card(id)?;
        if let Some(source) = source {
            if card.board != source.board || card.position != source.index {
                return Err(BoardError::Conflict(format!(
                    "Card {} is no longer at {}[{}]",
                    card.project_id, source.board, source.index
                )));
            }
        }
        match target {
            DropTarget::Trash => self.trash_card(id, actor),
            DropTarget::Board { board, index } => self.move_card(id, &board, index, actor),
        }
    }

    /// Relocates a regular card to the completed or cancelled board.
    pub fn move_ticket_to_finalized(&mut self, id: &str, outcome: BoardKind, actor: &Actor) -> BoardResult<Card> {
        let activity = match outcome {
            BoardKind::Completed => ActivityKind::Completed,
            BoardKind::Cancelled => ActivityKind::Cancelled,
            _ => return Err(BoardError::Invalid("Outcome must be completed or cancelled".to_string())),
        };
        let card = self.card(id)?;
        let from = card.board.clone();
        if self.kind_of(card) != BoardKind::Regular {
            return Err(BoardError::Invalid(format!(
                "Card {} is not on a regular board",
                card.project_id
            )));
        }
        let target = self.board_of_kind(outcome)?;

        self.place(id, &target, None)?;
        if let Some(card) = self.cards.get_mut(id) {
            card.completed_at = Some(Utc::now());
            card.last_active_board = Some(from.clone());
        }
        let verb = if outcome == BoardKind::Completed { "Completed" } else { "Cancelled" };
        self.record(id, actor, activity, format!("{} from {}", verb, from), Some((from, target)))
    }

    /// Brings a finalized or trashed card back to a regular board.
    pub fn restore_card(&mut self, id: &str, to: Option<&str>, actor: &Actor) -> BoardResult<Card> {
        let card = self.card(id)?;
        let from = card.board.clone();
        if self.kind_of(card) == BoardKind::Regular {
            return Err(BoardError::Invalid(format!(
                "Card {} is already on a regular board",
                card.project_id
            )));
        }

        let target = match to {
            Some(board) => {
                self.require_regular(board)?;
                board.to_string()
            }
            None => match card
                .last_active_board
                .as_deref()
                .filter(|b| self.require_regular(b).is_ok())
            {
                Some(board) => board.to_string(),
                None => self.first_regular()?,
            },
        };

        self.place(id, &target, None)?;
        if let Some(card) = self.cards.get_mut(id) {
            card.completed_at = None;
            card.last_active_board = None;
        }
        self.record(
            id,
            actor,
            ActivityKind::Restored,
            format!("Restored from {} to {}", from, target),
            Some((from, target)),
        )
    }

    /// Drop on the trash target: the card leaves every column but is kept so it
    /// can be restored or deleted for good.
    pub fn trash_card(&mut self, id: &str, actor: &Actor) -> BoardResult<Card> {
        let card = self.card(id)?;
        let from = card.board.clone();
        let kind = self.kind_of(card);
        if kind == BoardKind::Trash {
            return Err(BoardError::Invalid(format!("Card {} is already in the trash", card.project_id)));
        }
        let trash = self.board_of_kind(BoardKind::Trash)?;

        self.place(id, &trash, None)?;
        if kind == BoardKind::Regular {
            if let Some(card) = self.cards.get_mut(id) {
                card.last_active_board = Some(from.clone());
            }
        }
        self.record(id, actor, ActivityKind::Trashed, format!("Moved to trash from {}", from), Some((from, trash)))
    }

    /// Removes the card for good. Returns it so stored files can be cleaned up.
    pub fn delete_ticket(&mut self, id: &str) -> BoardResult<Card> {
        let card = self
            .cards
            .remove(id)
            .ok_or_else(|| BoardError::CardNotFound(id.to_string()))?;
        let lane = self.lane_ids(&card.board);
        self.write_positions(&card.board, &lane);
        Ok(card)
    }

    // ── Comments, attachments, checklist ──────────────────────────────

    pub fn add_comment(&mut self, id: &str, text: &str, actor: &Actor) -> BoardResult<Comment> {
        let text = clean_name(text, "Comment")?;
        self.editable_card(id)?;
        let comment = Comment {
            id: new_id(),
            author: actor.username.clone(),
            text,
            created_at: Utc::now(),
        };
        if let Some(card) = self.cards.get_mut(id) {
            card.comments.push(comment.clone());
        }
        self.record(id, actor, ActivityKind::Commented, "Added a comment".to_string(), None)?;
        Ok(comment)
    }

    pub fn delete_comment(&mut self, id: &str, comment_id: &str, actor: &Actor) -> BoardResult<Card> {
        let card = self.editable_card(id)?;
        let comment = card
            .comments
            .iter()
            .find(|c| c.id == comment_id)
            .ok_or_else(|| BoardError::ItemNotFound(format!("Comment '{}'", comment_id)))?;
        if comment.author != actor.username && !actor.is_admin {
            return Err(BoardError::Forbidden(
                "Only the author or an administrator can delete a comment".to_string(),
            ));
        }
        if let Some(card) = self.cards.get_mut(id) {
            card.comments.retain(|c| c.id != comment_id);
        }
        self.record(id, actor, ActivityKind::CommentDeleted, "Deleted a comment".to_string(), None)
    }

    pub fn add_attachment(&mut self, id: &str, attachment: Attachment, actor: &Actor) -> BoardResult<Card> {
        self.editable_card(id)?;
        let message = format!("Attached {}", attachment.name);
        if let Some(card) = self.cards.get_mut(id) {
            card.attachments.push(attachment);
        }
        self.record(id, actor, ActivityKind::AttachmentAdded, message, None)
    }

    pub fn remove_attachment(&mut self, id: &str, attachment_id: &str, actor: &Actor) -> BoardResult<Attachment> {
        let card = self.editable_card(id)?;
        let attachment = card
            .attachments
            .iter()
            .find(|a| a.id == attachment_id)
            .cloned()
            .ok_or_else(|| BoardError::ItemNotFound(format!("Attachment '{}'", attachment_id)))?;
        if let Some(card) = self.cards.get_mut(id) {
            card.attachments.retain(|a| a.id != attachment_id);
        }
        self.record(
            id,
            actor,
            ActivityKind::AttachmentRemoved,
            format!("Removed {}", attachment.name),
            None,
        )?;
        Ok(attachment)
    }

    pub fn add_pending_item(&mut self, id: &str, text: &str, actor: &Actor) -> BoardResult<PendingItem> {
        let text = clean_name(text, "Item")?;
        self.editable_card(id)?;
        let item = PendingItem {
            id: new_id(),
            text,
            completed: false,
        };
        if let Some(card) = self.cards.get_mut(id) {
            card.pending_items.push(item.clone());
        }
        self.record(id, actor, ActivityKind::ChecklistChanged, format!("Added item '{}'", item.text), None)?;
        Ok(item)
    }

    pub fn update_pending_item(
        &mut self,
        id: &str,
        item_id: &str,
        text: Option<&str>,
        completed: Option<bool>,
        actor: &Actor,
    ) -> BoardResult<PendingItem> {
        let text = text.map(|t| clean_name(t, "Item")).transpose()?;
        let card = self.editable_card(id)?;
        if !card.pending_items.iter().any(|i| i.id == item_id) {
            return Err(BoardError::ItemNotFound(format!("Pending item '{}'", item_id)));
        }

        let mut item = None;
        if let Some(card) = self.cards.get_mut(id) {
            if let Some(entry) = card.pending_items.iter_mut().find(|i| i.id == item_id) {
                if let Some(text) = text {
                    entry.text = text;
                }
                if let Some(completed) = completed {
                    entry.completed = completed;
                }
                item = Some(entry.clone());
            }
        }
        let item = item.ok_or_else(|| BoardError::ItemNotFound(format!("Pending item '{}'", item_id)))?;
        let state = if item.completed { "done" } else { "open" };
        self.record(
            id,
            actor,
            ActivityKind::ChecklistChanged,
            format!("Item '{}' is {}", item.text, state),
            None,
        )?;
        Ok(item)
    }

    pub fn remove_pending_item(&mut self, id: &str, item_id: &str, actor: &Actor) -> BoardResult<Card> {
        let card = self.editable_card(id)?;
        let item = card
            .pending_items
            .iter()
            .find(|i| i.id == item_id)
            .cloned()
            .ok_or_else(|| BoardError::ItemNotFound(format!("Pending item '{}'", item_id)))?;
        if let Some(card) = self.cards.get_mut(id) {
            card.pending_items.retain(|i| i.id != item_id);
        }
        self.record(id, actor, ActivityKind::ChecklistChanged, format!("Removed item '{}'", item.text), None)
    }

    // ── Boards ────────────────────────────────────────────────────────

    fn ensure_unique_board(&self, name: &str) -> BoardResult<()> {
        if RESERVED_BOARD_NAMES.iter().any(|r| r.eq_ignore_ascii_case(name)) {
            return Err(BoardError::Invalid(format!("'{}' is a reserved board name", name)));
        }
        if self.boards.iter().any(|b| b.name.to_lowercase() == name.to_lowercase()) {
            return Err(BoardError::Conflict(format!("Board '{}' already exists", name)));
        }
        Ok(())
    }

    pub fn create_board(&mut self, name: &str, color: Option<String>) -> BoardResult<Board> {
        let name = clean_name(name, "Board name")?;
        self.ensure_unique_board(&name)?;
        let color = color.map(|c| validate_color(&c)).transpose()?;
        let mut board = Board::new(&name, BoardKind::Regular, self.regular_boards().len());
        board.color = color;
        self.boards.push(board.clone());
        Ok(board)
    }

    pub fn rename_board(&mut self, old: &str, new: &str) -> BoardResult<Board> {
        let new = clean_name(new, "Board name")?;
        if self.board(old).is_none() {
            return Err(BoardError::BoardNotFound(old.to_string()));
        }
        if old == new {
            return self.board_mut(old).map(|b| b.clone());
        }
        if old.to_lowercase() != new.to_lowercase() {
            self.ensure_unique_board(&new)?;
        }

        let ids: Vec<String> = self
            .cards
            .values()
            .filter(|c| c.board == old || c.last_active_board.as_deref() == Some(old))
            .map(|c| c.id.clone())
            .collect();
        for id in ids {
            if let Some(card) = self.cards.get_mut(id.as_str()) {
                if card.board == old {
                    card.board = new.clone();
                }
                if card.last_active_board.as_deref() == Some(old) {
                    card.last_active_board = Some(new.clone());
                }
            }
        }
        let board = self.board_mut(old)?;
        board.name = new;
        Ok(board.clone())
    }

    pub fn delete_board(&mut self, name: &str) -> BoardResult<()> {
        self.require_regular(name)?;
        if !self.lane(name).is_empty() {
            return Err(BoardError::Invalid(format!(
                "Board '{}' still has cards; move them first",
                name
            )));
        }
        if self.regular_boards().len() <= 1 {
            return Err(BoardError::Invalid("The last regular board cannot be deleted".to_string()));
        }

        self.boards.retain(|b| b.name != name);
        let ids: Vec<String> = self
            .cards
            .values()
            .filter(|c| c.last_active_board.as_deref() == Some(name))
            .map(|c| c.id.clone())
            .collect();
        for id in ids {
            if let Some(card) = self.cards.get_mut(id.as_str()) {
                card.last_active_board = None;
            }
        }
        let order: Vec<String> = self.regular_boards().iter().map(|b| b.name.clone()).collect();
        self.apply_board_order(&order);
        Ok(())
    }

    fn apply_board_order(&mut self, order: &[String]) {
        for board in self.boards.iter_mut() {
            if let Some(index) = order.iter().position(|n| *n == board.name) {
                board.position = index;
            }
        }
    }

    /// Sets the display order of the regular boards.
    pub fn update_ordered(&mut self, ordered: &[String]) -> BoardResult<Vec<String>> {
        let mut current: Vec<String> = self.regular_boards().iter().map(|b| b.name.clone()).collect();
        let mut requested = ordered.to_vec();
        current.sort();
        requested.sort();
        if current != requested {
            return Err(BoardError::Invalid(
                "Order must list every regular board exactly once".to_string(),
            ));
        }
        self.apply_board_order(ordered);
        Ok(ordered.to_vec())
    }

    pub fn set_board_color(&mut self, name: &str, color: Option<&str>) -> BoardResult<Board> {
        let color = color.map(validate_color).transpose()?;
        let board = self.board_mut(name)?;
        board.color = color;
        Ok(board.clone())
    }

    pub fn board_colors(&self) -> BTreeMap<String, String> {
        self.boards
            .iter()
            .filter_map(|b| b.color.as_ref().map(|c| (b.name.clone(), c.clone())))
            .collect()
    }

    pub fn board_members(&self, name: &str) -> BoardResult<Vec<String>> {
        self.board(name)
            .map(|b| b.members.clone())
            .ok_or_else(|| BoardError::BoardNotFound(name.to_string()))
    }

    pub fn add_board_member(&mut self, name: &str, username: &str, actor: &Actor) -> BoardResult<Vec<String>> {
        require_admin(actor)?;
        let username = clean_name(username, "Username")?;
        let board = self.board_mut(name)?;
        if !board.members.contains(&username) {
            board.members.push(username);
        }
        Ok(board.members.clone())
    }

    pub fn remove_board_member(&mut self, name: &str, username: &str, actor: &Actor) -> BoardResult<Vec<String>> {
        require_admin(actor)?;
        let board = self.board_mut(name)?;
        if !board.members.iter().any(|m| m == username) {
            return Err(BoardError::ItemNotFound(format!("Member '{}'", username)));
        }
        board.members.retain(|m| m != username);
        Ok(board.members.clone())
    }

    // ── Field configuration ───────────────────────────────────────────

    fn set_fields(&mut self, fields: Vec<FieldConfig>) {
        self.schema = Arc::new(FormSchema::build(&fields));
        self.fields = fields;
    }

    fn field_index(&self, field_name: &str) -> BoardResult<usize> {
        self.fields
            .iter()
            .position(|f| f.field_name == field_name)
            .ok_or_else(|| BoardError::FieldNotFound(field_name.to_string()))
    }

    fn ensure_editable_field(field_name: &str, action: &str) -> BoardResult<()> {
        if is_protected(field_name) {
            return Err(BoardError::Forbidden(format!(
                "Field '{}' is protected and cannot be {}",
                field_name, action
            )));
        }
        Ok(())
    }

    pub fn create_field(&mut self, req: CreateFieldRequest) -> BoardResult<FieldConfig> {
        let field_name = req.field_name.trim().to_string();
        if self.fields.iter().any(|f| f.field_name == field_name) {
            return Err(BoardError::Conflict(format!("Field '{}' already exists", field_name)));
        }
        let order = req
            .order
            .unwrap_or_else(|| self.fields.iter().map(|f| f.order).max().map_or(0, |m| m + 1));
        let config = FieldConfig {
            field_name,
            label: req.label.trim().to_string(),
            kind: req.kind,
            required: req.required,
            active: req.active,
            visible: req.visible,
            options: req.options.iter().map(|o| o.trim().to_string()).collect(),
            order,
        };
        validate_definition(&config)?;

        let mut fields = self.fields.clone();
        fields.push(config.clone());
        self.set_fields(fields);
        Ok(config)
    }

    pub fn update_field(&mut self, field_name: &str, req: UpdateFieldRequest) -> BoardResult<FieldConfig> {
        let index = self.field_index(field_name)?;
        Self::ensure_editable_field(field_name, "edited")?;

        let mut config = self.fields[index].clone();
        if let Some(label) = req.label {
            config.label = label.trim().to_string();
        }
        if let Some(kind) = req.kind {
            config.kind = kind;
            if !kind.has_options() && req.options.is_none() {
                config.options.clear();
            }
        }
        if let Some(required) = req.required {
            config.required = required;
        }
        if let Some(active) = req.active {
            config.active = active;
        }
        if let Some(visible) = req.visible {
            config.visible = visible;
        }
        if let Some(options) = req.options {
            config.options = options.iter().map(|o| o.trim().to_string()).collect();
        }
        validate_definition(&config)?;

        let mut fields = self.fields.clone();
        fields[index] = config.clone();
        self.set_fields(fields);
        Ok(config)
    }

    pub fn delete_field(&mut self, field_name: &str) -> BoardResult<FieldConfig> {
        let index = self.field_index(field_name)?;
        Self::ensure_editable_field(field_name, "deleted")?;
        let mut fields = self.fields.clone();
        let removed = fields.remove(index);
        self.set_fields(fields);
        Ok(removed)
    }

    pub fn reorder_fields(&mut self, order: &[String]) -> BoardResult<Vec<FieldConfig>> {
        let mut current: Vec<&str> = self.fields.iter().map(|f| f.field_name.as_str()).collect();
        let mut requested: Vec<&str> = order.iter().map(String::as_str).collect();
        current.sort_unstable();
        requested.sort_unstable();
        if current != requested {
            return Err(BoardError::Invalid("Order must list every field exactly once".to_string()));
        }

        let mut fields = self.fields.clone();
        for field in fields.iter_mut() {
            if let Some(index) = order.iter().position(|n| *n == field.field_name) {
                field.order = index as i32;
            }
        }
        self.set_fields(fields);
        Ok(self.fields())
    }

    // ── Derived views ─────────────────────────────────────────────────

    fn columns_of(&self, boards: &[&Board]) -> BTreeMap<String, Vec<Card>> {
        boards
            .iter()
            .map(|b| (b.name.clone(), self.lane(&b.name).into_iter().cloned().collect()))
            .collect()
    }

    pub fn board_view(&self) -> BoardView {
        let regular = self.regular_boards();
        let finalized = self.finalized_boards();
        BoardView {
            variant: self.variant,
            columns: self.columns_of(&regular),
            ordered: regular.iter().map(|b| b.name.clone()).collect(),
            finalized_columns: self.columns_of(&finalized),
            finalized_ordered: finalized.iter().map(|b| b.name.clone()).collect(),
            board_members: self
                .boards
                .iter()
                .filter(|b| b.kind != BoardKind::Trash)
                .map(|b| (b.name.clone(), b.members.clone()))
                .collect(),
            colors: self.board_colors(),
            revision: self.revision,
        }
    }

    /// Flat list across boards, in board order then card position.
    pub fn task_list(&self, query: &TaskQuery) -> Vec<TaskItem> {
        let mut boards = self.regular_boards();
        if query.include_finalized {
            boards.extend(self.finalized_boards());
        }
        let needle = query.q.as_ref().map(|q| q.trim().to_lowercase()).filter(|q| !q.is_empty());

        boards
            .into_iter()
            .filter(|b| query.board.as_ref().map_or(true, |name| *name == b.name))
            .flat_map(|b| self.lane(&b.name).into_iter().map(move |c| (b.kind, c)))
            .filter(|(_, c)| query.member.as_ref().map_or(true, |m| c.members.contains(m)))
            .filter(|(_, c)| {
                needle.as_ref().map_or(true, |n| {
                    c.name.to_lowercase().contains(n) || c.project_id.to_lowercase().contains(n)
                })
            })
            .map(|(kind, c)| TaskItem {
                card: c.clone(),
                board_kind: kind,
            })
            .collect()
    }

    /// Verifies that every card sits in exactly one known board and that
    /// positions are gap-free within each board.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut names = HashSet::new();
        for board in &self.boards {
            if !names.insert(board.name.as_str()) {
                return Err(format!("duplicate board '{}'", board.name));
            }
        }
        for card in self.cards.values() {
            if !names.contains(card.board.as_str()) {
                return Err(format!("card {} is on unknown board '{}'", card.id, card.board));
            }
        }
        for board in &self.boards {
            let positions: Vec<usize> = self.lane(&board.name).iter().map(|c| c.position).collect();
            let expected: Vec<usize> = (0..positions.len()).collect();
            if positions != expected {
                return Err(format!("board '{}' has positions {:?}", board.name, positions));
            }
        }
        Ok(())
    }
}

fn require_admin(actor: &Actor) -> BoardResult<()> {
    if !actor.is_admin {
        return Err(BoardError::Forbidden(
            "Only administrators can change board members".to_string(),
        ));
    }
    Ok(())
}

fn validate_color(color: &str) -> BoardResult<String> {
    let color = color.trim();
    if color.is_empty() || color.len() > 32 || color.chars().any(char::is_whitespace) {
        return Err(BoardError::Invalid(format!("Invalid color '{}'", color)));
    }
    Ok(color.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::field::FieldType;
    use serde_json::json;

    fn admin() -> Actor {
        Actor::new("admin", true)
    }

    fn ana() -> Actor {
        Actor::new("ana", false)
    }

    fn new_card(name: &str) -> CreateCardRequest {
        CreateCardRequest {
            name: name.to_string(),
            board: None,
            members: Vec::new(),
            fields: Map::new(),
        }
    }

    fn lane_names(ws: &Workspace, board: &str) -> Vec<String> {
        ws.lane(board).iter().map(|c| c.name.clone()).collect()
    }

    #[test]
    fn test_create_card_assigns_ids_and_defaults() {
        let mut ws = Workspace::new(BoardVariant::RegistroCivil);
        let card = ws.create_card(new_card("Certidão de nascimento"), &ana()).unwrap();

        assert_eq!(card.project_id, "RC-1");
        assert_eq!(card.board, "A Fazer");
        assert_eq!(card.position, 0);
        assert_eq!(card.version, 1);
        assert_eq!(card.fields["tipo"], json!(""));
        assert!(!card.fields.contains_key("name"));
        assert_eq!(card.activity.len(), 1);
        assert_eq!(card.activity[0].kind, ActivityKind::Created);
        ws.check_invariants().unwrap();
    }

    #[test]
    fn test_project_id_reuses_lowest_free_number() {
        let mut ws = Workspace::new(BoardVariant::Scrumboard);
        let a = ws.create_card(new_card("a"), &ana()).unwrap();
        ws.create_card(new_card("b"), &ana()).unwrap();
        ws.delete_ticket(&a.id).unwrap();
        let c = ws.create_card(new_card("c"), &ana()).unwrap();
        assert_eq!(c.project_id, "SB-1");
        let d = ws.create_card(new_card("d"), &ana()).unwrap();
        assert_eq!(d.project_id, "SB-3");
    }

    #[test]
    fn test_create_card_rejects_invalid_fields() {
        let mut ws = Workspace::new(BoardVariant::RegistroCivil);
        let mut req = new_card("x");
        req.fields.insert("tipo".to_string(), json!("Divórcio"));
        req.fields.insert("dataEntrada".to_string(), json!("ontem"));
        let err = ws.create_card(req, &ana()).unwrap_err();
        match err {
            BoardError::Fields(errors) => {
                assert!(errors.contains_key("tipo"));
                assert!(errors.contains_key("dataEntrada"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(ws.cards().count(), 0);
    }

    #[test]
    fn test_create_card_on_finalized_board_is_rejected() {
        let mut ws = Workspace::new(BoardVariant::Scrumboard);
        let mut req = new_card("x");
        req.board = Some(defaults::COMPLETED_BOARD.to_string());
        assert!(matches!(ws.create_card(req, &ana()), Err(BoardError::Invalid(_))));
    }

    #[test]
    fn test_move_within_board_reorders() {
        let mut ws = Workspace::new(BoardVariant::Scrumboard);
        ws.create_card(new_card("a"), &ana()).unwrap();
        ws.create_card(new_card("b"), &ana()).unwrap();
        let c = ws.create_card(new_card("c"), &ana()).unwrap();

        let moved = ws.move_card(&c.id, "A Fazer", 0, &ana()).unwrap();
        assert_eq!(moved.position, 0);
        assert_eq!(lane_names(&ws, "A Fazer"), vec!["c", "a", "b"]);
        // no status change, no activity entry
        assert_eq!(moved.activity.len(), 1);
        ws.check_invariants().unwrap();
    }

    #[test]
    fn test_move_across_boards_logs_status_change() {
        let mut ws = Workspace::new(BoardVariant::Scrumboard);
        let a = ws.create_card(new_card("a"), &ana()).unwrap();
        ws.create_card(new_card("b"), &ana()).unwrap();
        let x = ws
            .create_card(CreateCardRequest { board: Some("Em Andamento".into()), ..new_card("x") }, &ana())
            .unwrap();

        let moved = ws.move_card(&a.id, "Em Andamento", 99, &ana()).unwrap();
        assert_eq!(moved.board, "Em Andamento");
        assert_eq!(moved.position, 1);
        let last = moved.activity.last().unwrap();
        assert_eq!(last.kind, ActivityKind::Moved);
        assert_eq!(last.from_board.as_deref(), Some("A Fazer"));
        assert_eq!(last.to_board.as_deref(), Some("Em Andamento"));

        assert_eq!(lane_names(&ws, "A Fazer"), vec!["b"]);
        assert_eq!(lane_names(&ws, "Em Andamento"), vec!["x", "a"]);
        assert_eq!(ws.card(&x.id).unwrap().position, 0);
        ws.check_invariants().unwrap();
    }

    #[test]
    fn test_move_into_finalized_board_is_rejected() {
        let mut ws = Workspace::new(BoardVariant::Scrumboard);
        let a = ws.create_card(new_card("a"), &ana()).unwrap();
        assert!(ws.move_card(&a.id, defaults::COMPLETED_BOARD, 0, &ana()).is_err());
        assert!(ws.move_card(&a.id, "Nope", 0, &ana()).is_err());
        assert_eq!(ws.card(&a.id).unwrap().board, "A Fazer");
    }

    #[test]
    fn test_drop_with_stale_source_is_rejected() {
        let mut ws = Workspace::new(BoardVariant::Scrumboard);
        let a = ws.create_card(new_card("a"), &ana()).unwrap();
        ws.create_card(new_card("b"), &ana()).unwrap();

        let stale = DragLocation { board: "A Fazer".into(), index: 1 };
        let err = ws
            .drop_card(&a.id, Some(&stale), DropTarget::Trash, &ana())
            .unwrap_err();
        assert!(matches!(err, BoardError::Conflict(_)));

        let fresh = DragLocation { board: "A Fazer".into(), index: 0 };
        let trashed = ws.drop_card(&a.id, Some(&fresh), DropTarget::Trash, &ana()).unwrap();
        assert_eq!(trashed.board, defaults::TRASH_BOARD);
        assert_eq!(trashed.last_active_board.as_deref(), Some("A Fazer"));
        assert_eq!(lane_names(&ws, "A Fazer"), vec!["b"]);
        ws.check_invariants().unwrap();
    }

    #[test]
    fn test_complete_and_restore_roundtrip() {
        let mut ws = Workspace::new(BoardVariant::Scrumboard);
        let a = ws
            .create_card(CreateCardRequest { board: Some("Em Revisão".into()), ..new_card("a") }, &ana())
            .unwrap();

        let done = ws.move_ticket_to_finalized(&a.id, BoardKind::Completed, &ana()).unwrap();
        assert_eq!(done.board, defaults::COMPLETED_BOARD);
        assert!(done.completed_at.is_some());
        assert_eq!(done.last_active_board.as_deref(), Some("Em Revisão"));
        assert!(ws.move_ticket_to_finalized(&a.id, BoardKind::Cancelled, &ana()).is_err());

        let back = ws.restore_card(&a.id, None, &ana()).unwrap();
        assert_eq!(back.board, "Em Revisão");
        assert!(back.completed_at.is_none());
        assert_eq!(back.activity.last().unwrap().kind, ActivityKind::Restored);
        ws.check_invariants().unwrap();
    }

    #[test]
    fn test_restore_falls_back_to_first_regular_board() {
        let mut ws = Workspace::new(BoardVariant::Scrumboard);
        let a = ws
            .create_card(CreateCardRequest { board: Some("Em Revisão".into()), ..new_card("a") }, &ana())
            .unwrap();
        ws.move_ticket_to_finalized(&a.id, BoardKind::Cancelled, &ana()).unwrap();
        ws.delete_board("Em Revisão").unwrap();

        let back = ws.restore_card(&a.id, None, &ana()).unwrap();
        assert_eq!(back.board, "A Fazer");
    }

    #[test]
    fn test_trash_keeps_card_out_of_views() {
        let mut ws = Workspace::new(BoardVariant::Scrumboard);
        let a = ws.create_card(new_card("a"), &ana()).unwrap();
        let trashed = ws.trash_card(&a.id, &ana()).unwrap();
        assert_eq!(trashed.board, defaults::TRASH_BOARD);

        let view = ws.board_view();
        assert!(view.columns.values().all(|cards| cards.is_empty()));
        assert!(!view.finalized_columns.contains_key(defaults::TRASH_BOARD));
        assert!(ws.task_list(&TaskQuery { include_finalized: true, ..Default::default() }).is_empty());

        assert!(ws.add_comment(&a.id, "hello", &ana()).is_err());
        let restored = ws.restore_card(&a.id, None, &ana()).unwrap();
        assert_eq!(restored.board, "A Fazer");
    }

    #[test]
    fn test_update_card_checks_version_and_fields() {
        let mut ws = Workspace::new(BoardVariant::RegistroCivil);
        let a = ws.create_card(new_card("a"), &ana()).unwrap();

        let mut fields = Map::new();
        fields.insert("tipo".to_string(), json!("Casamento"));
        let updated = ws
            .update_card(
                &a.id,
                UpdateCardRequest {
                    fields: Some(fields),
                    expected_version: Some(a.version),
                    ..Default::default()
                },
                &ana(),
            )
            .unwrap();
        assert_eq!(updated.fields["tipo"], json!("Casamento"));
        assert_eq!(updated.version, a.version + 1);

        let stale = ws.update_card(
            &a.id,
            UpdateCardRequest {
                name: Some("b".into()),
                expected_version: Some(a.version),
                ..Default::default()
            },
            &ana(),
        );
        assert!(matches!(stale, Err(BoardError::Conflict(_))));

        let noop = ws
            .update_card(&a.id, UpdateCardRequest { name: Some("a".into()), ..Default::default() }, &ana())
            .unwrap();
        assert_eq!(noop.version, updated.version);
    }

    #[test]
    fn test_comment_deletion_requires_author_or_admin() {
        let mut ws = Workspace::new(BoardVariant::Scrumboard);
        let a = ws.create_card(new_card("a"), &ana()).unwrap();
        let comment = ws.add_comment(&a.id, "feito", &ana()).unwrap();

        let bob = Actor::new("bob", false);
        assert!(matches!(
            ws.delete_comment(&a.id, &comment.id, &bob),
            Err(BoardError::Forbidden(_))
        ));
        let card = ws.delete_comment(&a.id, &comment.id, &admin()).unwrap();
        assert!(card.comments.is_empty());
    }

    #[test]
    fn test_pending_items_lifecycle() {
        let mut ws = Workspace::new(BoardVariant::Scrumboard);
        let a = ws.create_card(new_card("a"), &ana()).unwrap();
        let item = ws.add_pending_item(&a.id, "RG do pai", &ana()).unwrap();
        assert!(!item.completed);

        let done = ws.update_pending_item(&a.id, &item.id, None, Some(true), &ana()).unwrap();
        assert!(done.completed);
        assert_eq!(ws.card(&a.id).unwrap().pending_items[0].text, "RG do pai");

        let card = ws.remove_pending_item(&a.id, &item.id, &ana()).unwrap();
        assert!(card.pending_items.is_empty());
        assert!(ws.remove_pending_item(&a.id, &item.id, &ana()).is_err());
    }

    #[test]
    fn test_board_membership_requires_admin() {
        let mut ws = Workspace::new(BoardVariant::Scrumboard);
        assert!(matches!(
            ws.add_board_member("A Fazer", "ana", &ana()),
            Err(BoardError::Forbidden(_))
        ));
        assert!(ws.board_members("A Fazer").unwrap().is_empty());

        ws.add_board_member("A Fazer", "ana", &admin()).unwrap();
        let members = ws.add_board_member("A Fazer", "ana", &admin()).unwrap();
        assert_eq!(members, vec!["ana"]);
        assert!(ws.remove_board_member("A Fazer", "ana", &admin()).unwrap().is_empty());
    }

    #[test]
    fn test_board_management() {
        let mut ws = Workspace::new(BoardVariant::Scrumboard);
        ws.create_board("Bloqueadas", Some("#ff0000".into())).unwrap();
        assert!(matches!(ws.create_board("bloqueadas", None), Err(BoardError::Conflict(_))));

        let a = ws
            .create_card(CreateCardRequest { board: Some("Bloqueadas".into()), ..new_card("a") }, &ana())
            .unwrap();
        ws.rename_board("Bloqueadas", "Impedidas").unwrap();
        assert_eq!(ws.card(&a.id).unwrap().board, "Impedidas");
        assert_eq!(ws.board_colors()["Impedidas"], "#ff0000");

        assert!(ws.delete_board("Impedidas").is_err());
        ws.delete_ticket(&a.id).unwrap();
        ws.delete_board("Impedidas").unwrap();
        assert!(ws.delete_board(defaults::COMPLETED_BOARD).is_err());

        let order = vec!["Em Revisão".to_string(), "A Fazer".to_string(), "Em Andamento".to_string()];
        ws.update_ordered(&order).unwrap();
        assert_eq!(ws.board_view().ordered, order);
        assert!(ws.update_ordered(&order[..2]).is_err());
    }

    #[test]
    fn test_route_segments_are_not_board_or_field_names() {
        let mut ws = Workspace::new(BoardVariant::Scrumboard);
        for name in ["order", "colors", "ORDER"] {
            assert!(matches!(ws.create_board(name, None), Err(BoardError::Invalid(_))));
            assert!(matches!(ws.rename_board("A Fazer", name), Err(BoardError::Invalid(_))));
        }
        assert!(ws.board("A Fazer").is_some());

        let err = ws.create_field(CreateFieldRequest {
            field_name: "order".into(),
            label: "Pedido".into(),
            kind: FieldType::Text,
            required: false,
            active: true,
            visible: true,
            options: Vec::new(),
            order: None,
        });
        assert!(matches!(err, Err(BoardError::Invalid(_))));
        assert!(ws.schema().get("order").is_none());
    }

    #[test]
    fn test_field_configuration_rules() {
        let mut ws = Workspace::new(BoardVariant::RegistroCivil);
        let created = ws
            .create_field(CreateFieldRequest {
                field_name: "livro".into(),
                label: "Livro".into(),
                kind: FieldType::Number,
                required: true,
                active: true,
                visible: true,
                options: Vec::new(),
                order: None,
            })
            .unwrap();
        assert_eq!(created.order, 7);
        assert!(ws.schema().get("livro").is_some());

        // the new required field now applies to new cards
        assert!(ws.create_card(new_card("x"), &ana()).is_err());

        assert!(matches!(
            ws.update_field("name", UpdateFieldRequest { required: Some(false), ..Default::default() }),
            Err(BoardError::Forbidden(_))
        ));
        assert!(matches!(ws.delete_field("atendente"), Err(BoardError::Forbidden(_))));

        ws.update_field("livro", UpdateFieldRequest { active: Some(false), ..Default::default() })
            .unwrap();
        assert!(ws.schema().get("livro").is_none());
        ws.create_card(new_card("x"), &ana()).unwrap();

        ws.delete_field("livro").unwrap();
        assert!(ws.delete_field("livro").is_err());
    }

    #[test]
    fn test_reorder_fields_allows_protected_fields() {
        let mut ws = Workspace::new(BoardVariant::Scrumboard);
        let mut names: Vec<String> = ws.fields().iter().map(|f| f.field_name.clone()).collect();
        names.reverse();
        let reordered = ws.reorder_fields(&names).unwrap();
        let got: Vec<String> = reordered.iter().map(|f| f.field_name.clone()).collect();
        assert_eq!(got, names);
        assert!(ws.reorder_fields(&names[1..]).is_err());
    }

    #[test]
    fn test_task_list_filters() {
        let mut ws = Workspace::new(BoardVariant::Scrumboard);
        let a = ws
            .create_card(CreateCardRequest { members: vec!["ana".into()], ..new_card("Alvará") }, &ana())
            .unwrap();
        ws.create_card(CreateCardRequest { board: Some("Em Andamento".into()), ..new_card("Balanço") }, &ana())
            .unwrap();
        let done = ws.create_card(new_card("Certidão"), &ana()).unwrap();
        ws.move_ticket_to_finalized(&done.id, BoardKind::Completed, &ana()).unwrap();

        assert_eq!(ws.task_list(&TaskQuery::default()).len(), 2);
        assert_eq!(ws.task_list(&TaskQuery { include_finalized: true, ..Default::default() }).len(), 3);

        let mine = ws.task_list(&TaskQuery { member: Some("ana".into()), ..Default::default() });
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].card.id, a.id);

        let search = ws.task_list(&TaskQuery { q: Some("sb-2".into()), ..Default::default() });
        assert_eq!(search.len(), 1);
        assert_eq!(search[0].card.name, "Balanço");
    }

    #[test]
    fn test_snapshot_repairs_positions() {
        let mut ws = Workspace::new(BoardVariant::Scrumboard);
        ws.create_card(new_card("a"), &ana()).unwrap();
        ws.create_card(new_card("b"), &ana()).unwrap();
        let mut snapshot = ws.to_snapshot();
        for (i, card) in snapshot.cards.iter_mut().enumerate() {
            card.position = i * 10 + 5;
        }
        snapshot.cards[0].board = "Vanished".to_string();

        let restored = Workspace::from_snapshot(BoardVariant::Scrumboard, snapshot);
        restored.check_invariants().unwrap();
        assert_eq!(restored.lane("A Fazer").len(), 2);
    }
}
