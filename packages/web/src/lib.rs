//! # Web crate: the HTTP surface of the list-sharing service
//!
//! [`router`] builds the whole route table. Each protected route carries its own
//! guard chain (see [`gate`]); public routes carry none. CORS applies everywhere.
//! The session layer is left to the caller so the binary can use the Postgres
//! session store and tests an in-memory one.
//!
//! | Prefix | Handlers |
//! |--------|----------|
//! | `/auth`, `/reset`, `/admin/register` | [`handlers::auth`] |
//! | `/auth/oidc` | [`handlers::oidc`] |
//! | `/shared-list`, `/shared-collection` | [`handlers::shared`] |
//! | `/list` | [`handlers::lists`] |
//! | `/collections` | [`handlers::collections`] |
//! | `/admin` | [`handlers::admin`] |

pub mod gate;
pub mod handlers;

use axum::http::Method;
use axum::middleware;
use axum::routing::{delete, get, post, put, MethodRouter};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use api::guard::{
    Chain, CollectionIdOwner, ListIdDeleter, ListIdEditor, ListIdOwner, ListIdViewer,
    RequireAdmin, RequireGroupAdmin, RequireInstanceAdmin,
};
use api::AppContext;

use gate::{enforce, Gate, RouteClass};
use handlers::{admin, auth, collections, lists, oidc, shared};

const LIST_ID: &str = "listId";
const COLLECTION_ID: &str = "collectionId";
const USER_ID: &str = "userId";

/// Wraps method routers in the gate middleware.
struct Gates {
    ctx: AppContext,
}

impl Gates {
    fn page(&self, chain: Chain, route: MethodRouter<AppContext>) -> MethodRouter<AppContext> {
        self.wrap(RouteClass::Page, chain, route)
    }

    fn api(&self, chain: Chain, route: MethodRouter<AppContext>) -> MethodRouter<AppContext> {
        self.wrap(RouteClass::Api, chain, route)
    }

    fn wrap(
        &self,
        class: RouteClass,
        chain: Chain,
        route: MethodRouter<AppContext>,
    ) -> MethodRouter<AppContext> {
        let gate = Gate {
            ctx: self.ctx.clone(),
            chain,
            class,
        };
        route.route_layer(middleware::from_fn_with_state(gate, enforce))
    }
}

fn signed_in() -> Chain {
    Chain::authenticated()
}

fn list_viewer() -> Chain {
    signed_in().then(ListIdViewer(LIST_ID))
}

fn list_editor() -> Chain {
    signed_in().then(ListIdEditor(LIST_ID))
}

fn list_owner() -> Chain {
    signed_in().then(ListIdOwner(LIST_ID))
}

fn list_deleter() -> Chain {
    signed_in().then(ListIdDeleter(LIST_ID))
}

fn collection_owner() -> Chain {
    signed_in().then(CollectionIdOwner(COLLECTION_ID))
}

fn group_admin() -> Chain {
    signed_in().then(RequireAdmin)
}

fn manages_user() -> Chain {
    signed_in().then(RequireGroupAdmin(USER_ID))
}

fn instance_admin() -> Chain {
    signed_in().then(RequireInstanceAdmin)
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::HEAD,
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
        ])
        .allow_headers(Any)
}

fn public_routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/auth",
            get(auth::login_page).post(auth::login).delete(auth::logout),
        )
        .route("/auth/oidc/status", get(oidc::status))
        .route("/auth/oidc/login", get(oidc::login))
        .route("/auth/oidc/callback", get(oidc::callback))
        .route("/reset", post(auth::request_reset))
        .route(
            "/reset/{token}",
            get(auth::reset_status).post(auth::complete_reset),
        )
        .route(
            "/admin/register",
            get(auth::registration_status).put(auth::register),
        )
        .route("/shared-list/{code}", get(shared::list))
        .route("/shared-list/{code}/items", get(shared::list_items))
        .route("/shared-collection/{code}", get(shared::collection))
        .route(
            "/shared-collection/{ccode}/shared-list/{lcode}",
            get(shared::list_in_collection),
        )
        .route(
            "/shared-collection/{ccode}/shared-list/{lcode}/items",
            get(shared::list_items_in_collection),
        )
}

fn account_routes(gates: &Gates) -> Router<AppContext> {
    Router::new()
        .route("/auth/oidc/link", gates.api(signed_in(), post(oidc::link)))
        .route("/auth/oidc/unlink", gates.api(signed_in(), post(oidc::unlink)))
}

fn list_routes(gates: &Gates) -> Router<AppContext> {
    Router::new()
        .route("/", gates.page(signed_in(), get(lists::home)))
        .route("/list", gates.page(signed_in(), get(lists::dashboard)))
        .route("/list", gates.api(signed_in(), put(lists::create)))
        .route("/list/namecheck", gates.api(signed_in(), get(lists::name_check)))
        .route("/list/groupshared", gates.api(signed_in(), get(lists::group_shared)))
        .route("/list/{listId}", gates.page(list_viewer(), get(lists::detail)))
        .route("/list/{listId}", gates.api(list_editor(), post(lists::update)))
        .route("/list/{listId}", gates.api(list_deleter(), delete(lists::delete)))
        .route("/list/{listId}/items", gates.api(list_viewer(), get(lists::items)))
        .route("/list/{listId}/item", gates.api(list_viewer(), get(lists::items)))
        .route("/list/{listId}/item", gates.api(list_editor(), put(lists::add_item)))
        .route(
            "/list/{listId}/item/{itemId}",
            gates.api(
                list_editor(),
                post(lists::update_item).delete(lists::delete_item),
            ),
        )
        .route(
            "/list/{listId}/share",
            gates.api(list_owner(), put(lists::publish).delete(lists::unpublish)),
        )
}

fn collection_routes(gates: &Gates) -> Router<AppContext> {
    Router::new()
        .route("/collections", gates.page(signed_in(), get(collections::owned)))
        .route("/collections", gates.api(signed_in(), post(collections::create)))
        .route(
            "/collections/namecheck",
            gates.api(signed_in(), get(collections::name_check)),
        )
        .route(
            "/collections/{collectionId}",
            gates.page(collection_owner(), get(collections::detail)),
        )
        .route(
            "/collections/{collectionId}",
            gates.api(
                collection_owner(),
                put(collections::update).delete(collections::delete),
            ),
        )
        .route(
            "/collections/{collectionId}/lists",
            gates.api(collection_owner(), post(collections::add_lists)),
        )
        .route(
            "/collections/{collectionId}/lists/{listId}",
            gates.api(
                list_owner().then(CollectionIdOwner(COLLECTION_ID)),
                put(collections::add_list).delete(collections::remove_list),
            ),
        )
        .route(
            "/collections/{collectionId}/share",
            gates.api(
                collection_owner(),
                put(collections::publish).delete(collections::unpublish),
            ),
        )
}

fn admin_routes(gates: &Gates) -> Router<AppContext> {
    Router::new()
        .route("/admin/users", gates.page(group_admin(), get(admin::group_users)))
        .route(
            "/admin/users/create",
            gates.api(
                group_admin(),
                get(admin::create_user_options).put(admin::create_user),
            ),
        )
        .route(
            "/admin/user/{userId}/listscount",
            gates.api(manages_user(), get(admin::list_count)),
        )
        .route(
            "/admin/user/{userId}",
            gates.api(manages_user(), delete(admin::delete_user)),
        )
        .route(
            "/admin/user/{userId}/toggleadmin",
            gates.api(manages_user(), post(admin::toggle_admin)),
        )
        .route(
            "/admin/groupsharing",
            gates.api(
                group_admin(),
                get(admin::group_sharing).post(admin::toggle_group_sharing),
            ),
        )
        .route("/admin/allusers", gates.page(instance_admin(), get(admin::all_users)))
        .route(
            "/admin/user/{userId}/toggleinstanceadmin",
            gates.api(instance_admin(), post(admin::toggle_instance_admin)),
        )
}

/// The full route table over `ctx`. Add a `SessionManagerLayer` before serving.
pub fn router(ctx: AppContext) -> Router {
    let gates = Gates { ctx: ctx.clone() };
    Router::new()
        .merge(public_routes())
        .merge(account_routes(&gates))
        .merge(list_routes(&gates))
        .merge(collection_routes(&gates))
        .merge(admin_routes(&gates))
        .layer(cors())
        .with_state(ctx)
}
