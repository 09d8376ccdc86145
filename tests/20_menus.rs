mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{data, error_code, Caller, TestServer};

async fn create_menu(admin: &Caller<'_>, body: Value) -> Result<Value> {
    data(admin.post("/menus", &body).send().await?, StatusCode::CREATED).await
}

/// Directory D with page P and button B under P
async fn seed_tree(admin: &Caller<'_>) -> Result<(String, String, String)> {
    let dir = create_menu(
        admin,
        json!({ "menu_id": "D", "menu_name": "System", "menu_type": "directory", "sort_order": 1 }),
    )
    .await?;
    let page = create_menu(
        admin,
        json!({
            "menu_id": "P", "parent_id": "D", "menu_name": "Users", "menu_type": "menu",
            "route_path": "/users", "permission_code": "user:list"
        }),
    )
    .await?;
    let button = create_menu(
        admin,
        json!({
            "menu_id": "B", "parent_id": "P", "menu_name": "Create", "menu_type": "button",
            "permission_code": "user:create"
        }),
    )
    .await?;
    Ok((
        dir["menu_id"].as_str().unwrap_or_default().to_string(),
        page["menu_id"].as_str().unwrap_or_default().to_string(),
        button["menu_id"].as_str().unwrap_or_default().to_string(),
    ))
}

#[tokio::test]
async fn creates_menus_and_assembles_the_tree() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin();
    seed_tree(&admin).await?;

    let list = data(admin.get("/menus").send().await?, StatusCode::OK).await?;
    assert_eq!(list["total"], 3);
    let roots = list["menus"].as_array().unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0]["menu_id"], "D");
    assert_eq!(roots[0]["children"][0]["menu_id"], "P");
    assert_eq!(roots[0]["children"][0]["children"][0]["menu_id"], "B");

    // Alias route serves the same tree
    let tree = data(admin.get("/menu/tree").send().await?, StatusCode::OK).await?;
    assert_eq!(tree, list["menus"]);
    Ok(())
}

#[tokio::test]
async fn filtered_list_promotes_orphans_to_roots() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin();
    seed_tree(&admin).await?;

    let tree = data(admin.get("/menus/tree?menu_type=button").send().await?, StatusCode::OK).await?;
    let roots = tree.as_array().unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0]["menu_id"], "B");
    Ok(())
}

#[tokio::test]
async fn rejects_invalid_menu_shapes() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin();
    seed_tree(&admin).await?;

    // Same name under the same parent
    let res = admin
        .post("/menus", &json!({ "parent_id": "D", "menu_name": "Users", "menu_type": "menu" }))
        .send()
        .await?;
    assert_eq!(error_code(res, StatusCode::CONFLICT).await?, "CONFLICT");

    // Buttons never carry children
    let res = admin
        .post("/menus", &json!({ "parent_id": "B", "menu_name": "Nested", "menu_type": "button" }))
        .send()
        .await?;
    assert_eq!(error_code(res, StatusCode::BAD_REQUEST).await?, "VALIDATION_ERROR");

    // Unknown parent
    let res = admin
        .post("/menus", &json!({ "parent_id": "NOPE", "menu_name": "Lost", "menu_type": "menu" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Moving a node under its own descendant
    let res = admin.put("/menus/D", &json!({ "parent_id": "P" })).send().await?;
    assert_eq!(error_code(res, StatusCode::BAD_REQUEST).await?, "VALIDATION_ERROR");
    Ok(())
}

#[tokio::test]
async fn delete_refuses_nodes_with_children() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin();
    seed_tree(&admin).await?;

    let res = admin.delete("/menus/P").send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = admin.delete("/menus/B").send().await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = admin.delete("/menus/P").send().await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = admin.get("/menus/P").send().await?;
    assert_eq!(error_code(res, StatusCode::NOT_FOUND).await?, "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn updates_and_batch_status_and_stats() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin();
    seed_tree(&admin).await?;

    let updated = data(
        admin.put("/menus/P", &json!({ "menu_name": "People", "sort_order": 7 })).send().await?,
        StatusCode::OK,
    )
    .await?;
    assert_eq!(updated["menu_name"], "People");
    assert_eq!(updated["sort_order"], 7);
    assert_eq!(updated["parent_id"], "D");

    let batch = data(
        admin
            .put("/menus/batch-status", &json!({ "menu_ids": ["P", "B"], "status": "disable" }))
            .send()
            .await?,
        StatusCode::OK,
    )
    .await?;
    assert_eq!(batch["modified"], 2);

    let stats = data(admin.get("/menus/stats").send().await?, StatusCode::OK).await?;
    assert_eq!(stats["total_menus"], 3);
    assert_eq!(stats["enabled_menus"], 1);
    assert_eq!(stats["disabled_menus"], 2);
    assert_eq!(stats["directory_menus"], 1);
    assert_eq!(stats["page_menus"], 1);
    assert_eq!(stats["button_menus"], 1);

    let res = admin
        .put("/menus/batch-status", &json!({ "ids": [], "status": "enable" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
