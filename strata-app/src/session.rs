use std::fs;
use std::path::{Path, PathBuf};

use strata_config::AppConfig;
use strata_core::entity::EntityId;
use strata_core::resolver::PropertySource;
use strata_engine::bus::{ActionBus, ActionContext, ActionRequest};
use strata_engine::document::{DemoEntities, DispatchContext, Document, DocumentObserver};
use strata_engine::event::ChangeEvent;
use strata_engine::relevance;
use strata_engine::selection::Selection;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("读取脚本 {path:?} 失败: {source}")]
    Script {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 把文档变更写入日志，并为属性事件重新解析受影响实体上的值。
struct ChangeLogger;

impl DocumentObserver for ChangeLogger {
    fn changed(&mut self, event: &ChangeEvent, context: &mut DispatchContext<'_>) {
        let affected: Vec<u64> = event.affected().iter().map(|id| id.get()).collect();
        info!(kind = ?event.kind(), ?affected, "文档变更");

        let Some(name) = event.kind().property_name() else {
            return;
        };
        let resolver = context.resolver();
        for &id in event.affected() {
            match resolver.resolve(id, name) {
                Some(value) => debug!(entity = id.get(), property = name, %value, "属性当前值"),
                None => debug!(entity = id.get(), property = name, "属性已不存在"),
            }
        }
    }

    fn selection_changed(&mut self, selection: &Selection, _context: &mut DispatchContext<'_>) {
        debug!(
            current = ?selection.current().map(EntityId::get),
            count = selection.len(),
            "选择已改变"
        );
    }
}

fn default_script(ids: &DemoEntities) -> Vec<String> {
    vec![
        format!("select {}", ids.door.get()),
        "add_property hinge string left".to_string(),
        "set_property locked false".to_string(),
        "copy_properties hinge locked".to_string(),
        format!("select {} {}", ids.chest.get(), ids.orc.get()),
        "paste_properties".to_string(),
        format!("select {}", ids.orc.get()),
        "set_property stats.hp 25".to_string(),
        "add_property count string 12".to_string(),
        "convert_property int count".to_string(),
        format!("select {} {}", ids.ground.get(), ids.objects.get()),
        "drag_field layer.opacity 0.8".to_string(),
        "drag_field layer.opacity 0.6".to_string(),
        "set_field layer.offset 0,16".to_string(),
        "undo".to_string(),
        "redo".to_string(),
        "save".to_string(),
    ]
}

fn load_script(path: &Path) -> Result<Vec<String>, SessionError> {
    let content = fs::read_to_string(path).map_err(|source| SessionError::Script {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(content.lines().map(str::to_string).collect())
}

/// 在演示文档上执行脚本并打印结果概览。
pub fn run(config: &AppConfig, script: Option<&Path>) -> Result<(), SessionError> {
    let (mut document, ids) = Document::demo();
    document.configure_history(config.history.undo_limit, config.history.merge_edits);
    document.subscribe(ChangeLogger);

    let lines = match script {
        Some(path) => {
            info!(path = %path.display(), "加载动作脚本");
            load_script(path)?
        }
        None => default_script(&ids),
    };

    let failed = execute(&mut document, &lines);
    if failed > 0 {
        warn!(failed, "部分动作执行失败");
    }

    print_summary(&document, &ids);
    Ok(())
}

/// 逐行执行动作请求，返回失败的请求数量。
fn execute(document: &mut Document, lines: &[String]) -> usize {
    let bus = ActionBus::new();
    let mut context = ActionContext::new(document);
    let mut failed = 0usize;
    for (index, line) in lines.iter().enumerate() {
        let Some(request) = ActionRequest::parse(line) else {
            continue;
        };
        let response = bus.dispatch(&request, &mut context);
        let message = response.message.unwrap_or_default();
        if response.success {
            println!("> {line}\n    {message}");
        } else {
            failed += 1;
            warn!(line = index + 1, action = %request.name, %message, "动作执行失败");
            println!("> {line}\n    失败: {message}");
        }
    }
    failed
}

fn describe_source(document: &Document, source: &PropertySource) -> String {
    let name_of = |id: EntityId| {
        document
            .graph()
            .entity(id)
            .map(|entity| entity.name.clone())
            .unwrap_or_else(|| id.to_string())
    };
    match source {
        PropertySource::Own => "自身".to_string(),
        PropertySource::Template(id) => format!("模板 {}", name_of(*id)),
        PropertySource::Tile(id) => format!("图块 {}", name_of(*id)),
        PropertySource::Class(name) => format!("类 {name}"),
    }
}

fn print_summary(document: &Document, ids: &DemoEntities) {
    println!("Strata 属性编辑会话");
    let resolver = document.resolver();
    for id in [ids.door, ids.chest, ids.orc] {
        let Some(entity) = document.graph().entity(id) else {
            continue;
        };
        let class_name = resolver.effective_class_name(id).unwrap_or("-");
        println!("  - {} {} [{}], 类={}", entity.kind(), id, entity.name, class_name);
        for (name, resolved) in resolver.resolve_all(id) {
            println!(
                "      {name} = {} ({})",
                resolved.value,
                describe_source(document, &resolved.source)
            );
        }
    }

    let relevant: Vec<String> = document
        .graph()
        .ids()
        .filter(|&id| relevance::objects_relevant(document, id))
        .map(|id| id.to_string())
        .collect();
    println!("与当前视图相关的实体: {}", relevant.join(", "));

    let history = document.history();
    println!(
        "撤销历史: 状态={:?}, 游标={}/{}, 可撤销={}",
        history.state(),
        history.cursor(),
        history.len(),
        history.undo_text().unwrap_or("-")
    );
}
