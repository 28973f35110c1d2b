use crate::{
    client::WorkItemRecord,
    engine::{
        ContextInner,
        relation::{Relation, RelationKind, RelationTarget, Relations},
        revisions::Revisions,
        store::WorkItemStore,
    },
    error::EngineError,
    fields,
    identity::WorkItemId,
    obs::sink::EngineEvent,
    patch::{PatchDocument, PatchOperation},
    types::Timestamp,
    value::FieldValue,
};
use std::{cell::RefCell, collections::BTreeMap, fmt, rc::Rc};

///
/// ItemState
///
/// Backing state of one wrapped work item. Exclusively owned by the run;
/// shared between the tracker registry and every handle pointing at the
/// same entity.
///

pub(crate) struct ItemState {
    pub(crate) id: WorkItemId,
    pub(crate) rev: u32,
    pub(crate) url: Option<String>,
    pub(crate) fields: BTreeMap<String, FieldValue>,
    pub(crate) relations: Vec<Relation>,
    /// Relations below this index are already persisted remotely;
    /// everything at or past it is serialized into the next save request.
    pub(crate) persisted_relations: usize,
    pub(crate) document: PatchDocument,
    pub(crate) dirty: bool,
    pub(crate) read_only: bool,
}

// Typed accessor generators over the core field vocabulary.
// Getters return a type-appropriate default when the field is absent.

macro_rules! text_field {
    ($get:ident, $set:ident, $name:expr) => {
        #[must_use]
        pub fn $get(&self) -> String {
            match self.field($name) {
                FieldValue::Text(s) => s,
                _ => String::new(),
            }
        }

        pub fn $set(&self, value: impl Into<String>) -> Result<(), EngineError> {
            self.set_field($name, value.into())
        }
    };
}

macro_rules! int_field {
    ($get:ident, $set:ident, $name:expr) => {
        #[must_use]
        pub fn $get(&self) -> i64 {
            self.field($name).as_int().unwrap_or(0)
        }

        pub fn $set(&self, value: i64) -> Result<(), EngineError> {
            self.set_field($name, value)
        }
    };
}

macro_rules! date_field {
    ($get:ident, $set:ident, $name:expr) => {
        #[must_use]
        pub fn $get(&self) -> Option<Timestamp> {
            self.field($name).as_timestamp()
        }

        pub fn $set(&self, value: Timestamp) -> Result<(), EngineError> {
            self.set_field($name, value)
        }
    };
}

///
/// WorkItem
///
/// Mutable façade over one tracked work item. Every field mutation is
/// recorded as exactly one patch operation; the accumulated document is
/// what a save submits.
///
/// Handles are cheap clones sharing one backing state; two handles denote
/// the same logical entity when their identity values are equal,
/// regardless of how they were obtained.
///

#[derive(Clone)]
pub struct WorkItem {
    pub(crate) ctx: Rc<ContextInner>,
    pub(crate) state: Rc<RefCell<ItemState>>,
}

impl WorkItem {
    /// Wrap a freshly loaded record and register it as existing.
    ///
    /// Seeds the revision guard so the save batch fails on concurrent
    /// remote edits.
    pub(crate) fn from_record(
        ctx: &Rc<ContextInner>,
        record: WorkItemRecord,
    ) -> Result<Self, EngineError> {
        let item = Self::wrap_loaded(ctx, record, false)?;
        item.ctx.emit(EngineEvent::ItemLoaded {
            id: item.state.borrow().id.as_wire(),
        });

        Ok(item)
    }

    /// Wrap a historical record as a read-only revision.
    ///
    /// Revision wrappers never contribute to a save batch.
    pub(crate) fn from_revision_record(
        ctx: &Rc<ContextInner>,
        record: WorkItemRecord,
    ) -> Result<Self, EngineError> {
        let rev = record.rev;
        let item = Self::wrap_loaded(ctx, record, true)?;
        item.ctx.emit(EngineEvent::RevisionLoaded {
            id: item.state.borrow().id.as_wire(),
            rev,
        });

        Ok(item)
    }

    fn wrap_loaded(
        ctx: &Rc<ContextInner>,
        record: WorkItemRecord,
        read_only: bool,
    ) -> Result<Self, EngineError> {
        let relations = record
            .relations
            .iter()
            .map(Relation::from_record)
            .collect::<Result<Vec<_>, _>>()?;

        let mut document = PatchDocument::new();
        document.push(PatchOperation::test(fields::REV_PATH, i64::from(record.rev)));

        let persisted_relations = relations.len();
        let state = Rc::new(RefCell::new(ItemState {
            id: WorkItemId::permanent(record.id),
            rev: record.rev,
            url: record.url,
            fields: record.fields,
            relations,
            persisted_relations,
            document,
            dirty: false,
            read_only,
        }));

        {
            let mut tracker = ctx.tracker.borrow_mut();
            tracker.ensure_open()?;
            if read_only {
                tracker.track_revision(Rc::clone(&state));
            } else {
                tracker.track_existing(Rc::clone(&state));
            }
        }

        Ok(Self {
            ctx: Rc::clone(ctx),
            state,
        })
    }

    /// Create a brand-new work item carrying a temporary identity.
    ///
    /// The project, type, and placeholder id are seeded directly into the
    /// field map; the patch log stays empty until the first mutation.
    pub(crate) fn new_item(
        ctx: &Rc<ContextInner>,
        project: String,
        work_item_type: String,
    ) -> Result<Self, EngineError> {
        let state = {
            let mut tracker = ctx.tracker.borrow_mut();
            tracker.ensure_open()?;
            let id = tracker.next_temporary();

            let mut item_fields = BTreeMap::new();
            item_fields.insert(fields::TEAM_PROJECT.to_string(), FieldValue::Text(project));
            item_fields.insert(
                fields::WORK_ITEM_TYPE.to_string(),
                FieldValue::Text(work_item_type),
            );
            item_fields.insert(fields::ID.to_string(), FieldValue::Int(id.as_wire()));

            let state = Rc::new(RefCell::new(ItemState {
                id,
                rev: 0,
                url: None,
                fields: item_fields,
                relations: Vec::new(),
                persisted_relations: 0,
                document: PatchDocument::new(),
                dirty: false,
                read_only: false,
            }));
            tracker.track_new(Rc::clone(&state));

            state
        };

        ctx.emit(EngineEvent::ItemCreated);

        Ok(Self {
            ctx: Rc::clone(ctx),
            state,
        })
    }

    pub(crate) fn from_state(ctx: &Rc<ContextInner>, state: Rc<RefCell<ItemState>>) -> Self {
        Self {
            ctx: Rc::clone(ctx),
            state,
        }
    }

    // ---------------------------------------------------------------------
    // Identity and status
    // ---------------------------------------------------------------------

    #[must_use]
    pub fn id(&self) -> WorkItemId {
        self.state.borrow().id
    }

    #[must_use]
    pub fn rev(&self) -> u32 {
        self.state.borrow().rev
    }

    #[must_use]
    pub fn url(&self) -> Option<String> {
        self.state.borrow().url.clone()
    }

    /// True while this entity only holds a temporary identity.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.id().is_temporary()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.state.borrow().dirty
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.state.borrow().read_only
    }

    /// The accumulated patch log (ordered, append-only).
    #[must_use]
    pub fn changes(&self) -> PatchDocument {
        self.state.borrow().document.clone()
    }

    // ---------------------------------------------------------------------
    // Field bag
    // ---------------------------------------------------------------------

    /// Read one field; absent fields read as [`FieldValue::Null`].
    #[must_use]
    pub fn field(&self, name: &str) -> FieldValue {
        self.state
            .borrow()
            .fields
            .get(name)
            .cloned()
            .unwrap_or(FieldValue::Null)
    }

    /// Mutate one field, appending exactly one Add (field was absent) or
    /// Replace (field was present) operation and marking the item dirty.
    pub fn set_field(&self, name: &str, value: impl Into<FieldValue>) -> Result<(), EngineError> {
        let value = value.into();
        {
            let mut state = self.state.borrow_mut();
            if state.read_only {
                return Err(EngineError::read_only(state.id));
            }

            let path = fields::field_path(name);
            let op = if state.fields.contains_key(name) {
                PatchOperation::replace(path, value.clone())
            } else {
                PatchOperation::add(path, value.clone())
            };
            state.fields.insert(name.to_string(), value);
            state.document.push(op);
            state.dirty = true;
        }
        self.ctx.emit(EngineEvent::FieldSet { field: name });

        Ok(())
    }

    /// Drop one field, appending a Remove operation.
    /// Removing an absent field is a no-op.
    pub fn remove_field(&self, name: &str) -> Result<(), EngineError> {
        let removed = {
            let mut state = self.state.borrow_mut();
            if state.read_only {
                return Err(EngineError::read_only(state.id));
            }

            if state.fields.remove(name).is_some() {
                state.document.push(PatchOperation::remove(fields::field_path(name)));
                state.dirty = true;
                true
            } else {
                false
            }
        };
        if removed {
            self.ctx.emit(EngineEvent::FieldSet { field: name });
        }

        Ok(())
    }

    // ---------------------------------------------------------------------
    // Typed core-field accessors
    // ---------------------------------------------------------------------

    text_field!(title, set_title, fields::TITLE);
    text_field!(description, set_description, fields::DESCRIPTION);
    text_field!(state, set_state, fields::STATE);
    text_field!(reason, set_reason, fields::REASON);
    text_field!(tags, set_tags, fields::TAGS);
    text_field!(team_project, set_team_project, fields::TEAM_PROJECT);
    text_field!(assigned_to, set_assigned_to, fields::ASSIGNED_TO);
    text_field!(area_path, set_area_path, fields::AREA_PATH);
    text_field!(iteration_path, set_iteration_path, fields::ITERATION_PATH);
    text_field!(history, set_history, fields::HISTORY);
    text_field!(created_by, set_created_by, fields::CREATED_BY);
    text_field!(changed_by, set_changed_by, fields::CHANGED_BY);
    text_field!(authorized_as, set_authorized_as, fields::AUTHORIZED_AS);

    int_field!(area_id, set_area_id, fields::AREA_ID);
    int_field!(iteration_id, set_iteration_id, fields::ITERATION_ID);
    int_field!(attached_file_count, set_attached_file_count, fields::ATTACHED_FILE_COUNT);
    int_field!(external_link_count, set_external_link_count, fields::EXTERNAL_LINK_COUNT);
    int_field!(hyper_link_count, set_hyper_link_count, fields::HYPER_LINK_COUNT);
    int_field!(related_link_count, set_related_link_count, fields::RELATED_LINK_COUNT);

    date_field!(created_date, set_created_date, fields::CREATED_DATE);
    date_field!(changed_date, set_changed_date, fields::CHANGED_DATE);
    date_field!(authorized_date, set_authorized_date, fields::AUTHORIZED_DATE);
    date_field!(revised_date, set_revised_date, fields::REVISED_DATE);

    /// The work-item type, fixed at creation.
    #[must_use]
    pub fn work_item_type(&self) -> String {
        match self.field(fields::WORK_ITEM_TYPE) {
            FieldValue::Text(s) => s,
            _ => String::new(),
        }
    }

    #[must_use]
    pub fn watermark(&self) -> f64 {
        self.field(fields::WATERMARK).as_float().unwrap_or(0.0)
    }

    pub fn set_watermark(&self, value: f64) -> Result<(), EngineError> {
        self.set_field(fields::WATERMARK, value)
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.field(fields::IS_DELETED).as_bool().unwrap_or(false)
    }

    pub fn set_is_deleted(&self, value: bool) -> Result<(), EngineError> {
        self.set_field(fields::IS_DELETED, value)
    }

    // ---------------------------------------------------------------------
    // Relations
    // ---------------------------------------------------------------------

    /// Snapshot of the current relation list.
    #[must_use]
    pub fn relations(&self) -> Relations {
        Relations(self.state.borrow().relations.clone())
    }

    /// The single Parent link, if any.
    pub fn parent_link(&self) -> Result<Option<Relation>, EngineError> {
        self.relations().parent()
    }

    /// Resolve the parent work item through the store.
    pub fn parent(&self) -> Result<Option<WorkItem>, EngineError> {
        match self.parent_link()? {
            Some(link) => self.store().get_relation(&link).map(Some),
            None => Ok(None),
        }
    }

    #[must_use]
    pub fn children_links(&self) -> Vec<Relation> {
        self.relations().children()
    }

    /// Resolve all child work items through the store.
    pub fn children(&self) -> Result<Vec<WorkItem>, EngineError> {
        let links = self.children_links();
        self.store().get_many(links.iter())
    }

    #[must_use]
    pub fn related_links(&self) -> Vec<Relation> {
        self.relations().related()
    }

    #[must_use]
    pub fn hyperlinks(&self) -> Vec<Relation> {
        self.relations().hyperlinks()
    }

    /// Append a Child link pointing at `child`.
    ///
    /// Only this side records the edge; establishing the child's Parent
    /// link is the caller's responsibility when the remote schema
    /// requires the inverse.
    pub fn add_child(&self, child: &WorkItem) -> Result<(), EngineError> {
        self.push_relation(Relation::to_item(RelationKind::Child, child.id()))
    }

    /// Append the single Parent link pointing at `parent`.
    pub fn add_parent(&self, parent: &WorkItem) -> Result<(), EngineError> {
        if self.parent_link()?.is_some() {
            return Err(EngineError::relation_invariant(
                "work item already has a parent relation",
            ));
        }

        self.push_relation(Relation::to_item(RelationKind::Parent, parent.id()))
    }

    /// Append a Related link pointing at `other`.
    pub fn add_related(&self, other: &WorkItem) -> Result<(), EngineError> {
        self.push_relation(Relation::to_item(RelationKind::Related, other.id()))
    }

    /// Append a Hyperlink to an external URL.
    pub fn add_hyperlink(&self, url: impl Into<String>) -> Result<(), EngineError> {
        self.push_relation(Relation::new(
            RelationKind::Hyperlink,
            RelationTarget::Url(url.into()),
        ))
    }

    fn push_relation(&self, relation: Relation) -> Result<(), EngineError> {
        let token = relation.kind.token().to_string();
        {
            let mut state = self.state.borrow_mut();
            if state.read_only {
                return Err(EngineError::read_only(state.id));
            }
            state.relations.push(relation);
            state.dirty = true;
        }
        self.ctx.emit(EngineEvent::RelationAdded { rel: &token });

        Ok(())
    }

    // ---------------------------------------------------------------------
    // History
    // ---------------------------------------------------------------------

    /// The immediately preceding revision, wrapped read-only.
    ///
    /// Revision 0 and unsaved items have no history; that is a terminal
    /// base case, not a failure.
    pub fn previous_revision(&self) -> Result<Option<WorkItem>, EngineError> {
        let (id, rev) = {
            let state = self.state.borrow();
            (state.id, state.rev)
        };
        let Some(permanent) = id.as_permanent() else {
            return Ok(None);
        };
        if rev == 0 {
            return Ok(None);
        }

        self.store().get_revision(permanent, rev - 1).map(Some)
    }

    /// Lazy walk over this item's history, newest first, ending at
    /// revision 0. Each step performs one resolution; nothing is
    /// pre-fetched.
    #[must_use]
    pub fn revisions(&self) -> Revisions {
        let state = self.state.borrow();

        Revisions::new(self.store(), state.id.as_permanent(), state.rev)
    }

    fn store(&self) -> WorkItemStore {
        WorkItemStore::from_inner(Rc::clone(&self.ctx))
    }
}

// Two wrappers denote the same logical entity when their identity values
// are equal, even if independently loaded.
impl PartialEq for WorkItem {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("WorkItem")
            .field("id", &state.id)
            .field("rev", &state.rev)
            .field("dirty", &state.dirty)
            .field("read_only", &state.read_only)
            .finish_non_exhaustive()
    }
}

///
/// TESTS
///
