//! Per-request context handed to sources, modifiers and the renderer.
//!
//! The engine never talks to the HTTP layer directly; the integrator fills in
//! a `MenuRequest` from whatever request type the web framework provides.

/// User context for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    /// User ID (empty for anonymous).
    pub id: String,
    /// Whether the user is authenticated.
    pub authenticated: bool,
}

impl UserContext {
    /// Create context for anonymous user.
    pub fn anonymous() -> Self {
        Self {
            id: String::new(),
            authenticated: false,
        }
    }

    /// Create context for authenticated user.
    pub fn authenticated(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            authenticated: true,
        }
    }
}

impl Default for UserContext {
    fn default() -> Self {
        Self::anonymous()
    }
}

/// Editing toolbar state attached to a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Toolbar {
    /// Page is rendered in edit mode.
    pub edit_mode_active: bool,
    /// Page is rendered in preview mode.
    pub preview_mode_active: bool,
    /// Viewer may see staff-only notices.
    pub is_staff: bool,
}

/// The request a menu is rendered for.
#[derive(Debug, Clone, Default)]
pub struct MenuRequest {
    /// Request path, e.g. "/en/about/team/".
    pub path: String,
    /// Requesting user.
    pub user: UserContext,
    /// Toolbar, when the page is rendered with one.
    pub toolbar: Option<Toolbar>,
}

impl MenuRequest {
    /// Create an anonymous request for a path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            user: UserContext::anonymous(),
            toolbar: None,
        }
    }

    /// Set the requesting user.
    pub fn with_user(mut self, user: UserContext) -> Self {
        self.user = user;
        self
    }

    /// Attach a toolbar.
    pub fn with_toolbar(mut self, toolbar: Toolbar) -> Self {
        self.toolbar = Some(toolbar);
        self
    }

    /// Check if the requesting user is authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.user.authenticated
    }

    /// Whether the page is rendered in edit or preview mode.
    pub fn edit_or_preview(&self) -> bool {
        self.toolbar
            .is_some_and(|t| t.edit_mode_active || t.preview_mode_active)
    }

    /// Whether the viewer should see staff notices.
    pub fn is_staff(&self) -> bool {
        self.toolbar.is_some_and(|t| t.is_staff)
    }
}
