use std::collections::HashMap;

use strata_core::entity::{EntityData, EntityId, Field, LayerData};
use strata_core::geometry::{Color, Point, PointF, Rect, RectF, Size};
use strata_core::properties::PropertySet;
use strata_core::value::{ClassValue, PropertyValue, ValueKind, convert};
use tracing::debug;

use crate::actions;
use crate::document::Document;
use crate::errors::EngineError;

#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub name: String,
    pub args: Vec<String>,
}

impl ActionRequest {
    /// 按空白切分一行脚本。空行与 `#` 开头的注释返回 `None`。
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let mut parts = line.split_whitespace().map(str::to_string);
        let name = parts.next()?;
        Some(Self {
            name,
            args: parts.collect(),
        })
    }

    fn arg(&self, index: usize) -> Result<&str, ActionResponse> {
        self.args
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| ActionResponse::err(format!("{}: 缺少第 {} 个参数", self.name, index + 1)))
    }

    fn rest(&self, from: usize) -> String {
        self.args.get(from..).map(|rest| rest.join(" ")).unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct ActionResponse {
    pub success: bool,
    pub message: Option<String>,
}

impl ActionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

impl From<EngineError> for ActionResponse {
    fn from(err: EngineError) -> Self {
        ActionResponse::err(err.to_string())
    }
}

pub trait ActionHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(&self, request: &ActionRequest, context: &mut ActionContext<'_>) -> ActionResponse;
}

/// 动作执行时的可变环境：目标文档与属性剪贴板。
pub struct ActionContext<'a> {
    pub document: &'a mut Document,
    pub clipboard: PropertySet,
}

impl<'a> ActionContext<'a> {
    pub fn new(document: &'a mut Document) -> Self {
        Self {
            document,
            clipboard: PropertySet::new(),
        }
    }
}

pub struct ActionBus {
    handlers: HashMap<&'static str, Box<dyn ActionHandler>>,
}

impl Default for ActionBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionBus {
    pub fn new() -> Self {
        let mut bus = Self {
            handlers: HashMap::new(),
        };
        bus.register(UndoAction);
        bus.register(RedoAction);
        bus.register(SaveAction);
        bus.register(SelectAction);
        bus.register(ClearSelectionAction);
        bus.register(AddPropertyAction);
        bus.register(SetPropertyAction);
        bus.register(ResetPropertyAction);
        bus.register(RemovePropertyAction);
        bus.register(RenamePropertyAction);
        bus.register(ConvertPropertyAction);
        bus.register(CopyPropertiesAction);
        bus.register(CutPropertiesAction);
        bus.register(PastePropertiesAction);
        bus.register(SetClassAction);
        bus.register(SetFieldAction);
        bus.register(DragFieldAction);
        bus.register(BeginMacroAction);
        bus.register(EndMacroAction);
        bus.register(AddLayerAction);
        bus.register(RemoveSelectedAction);
        bus
    }

    pub fn register<H: ActionHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.name(), Box::new(handler));
    }

    pub fn dispatch(&self, request: &ActionRequest, context: &mut ActionContext<'_>) -> ActionResponse {
        if let Some(handler) = self.handlers.get(request.name.as_str()) {
            debug!(action = %request.name, args = ?request.args, "执行动作");
            handler.execute(request, context)
        } else {
            ActionResponse::err(format!("未知命令: {}", request.name))
        }
    }

    pub fn available_actions(&self) -> impl Iterator<Item = &&'static str> {
        self.handlers.keys()
    }
}

fn parse_ids(args: &[String]) -> Result<Vec<EntityId>, ActionResponse> {
    args.iter()
        .map(|arg| {
            arg.trim_start_matches('#')
                .parse::<u64>()
                .map(EntityId::new)
                .map_err(|_| ActionResponse::err(format!("无效的实体标识: {arg}")))
        })
        .collect()
}

fn parse_kind(text: &str) -> Result<ValueKind, ActionResponse> {
    text.parse::<ValueKind>()
        .map_err(|err| ActionResponse::err(err.to_string()))
}

fn parse_field(text: &str) -> Result<Field, ActionResponse> {
    text.parse::<Field>()
        .map_err(|err| ActionResponse::err(err.to_string()))
}

fn parse_path(text: &str) -> Vec<String> {
    text.split('.').map(str::to_string).collect()
}

/// 新建属性时使用的初始值。类值从类目录中取成员默认值。
fn initial_value(
    document: &Document,
    kind: ValueKind,
    text: &str,
) -> Result<PropertyValue, ActionResponse> {
    if kind == ValueKind::ClassRef {
        let definition = document
            .graph()
            .class_definition(text)
            .ok_or_else(|| ActionResponse::err(format!("未知的类: {text}")))?;
        return Ok(PropertyValue::ClassRef(ClassValue::new(
            text,
            definition.members.clone(),
        )));
    }
    if !text.is_empty() {
        return convert(&PropertyValue::from(text), kind)
            .map_err(|err| ActionResponse::err(err.to_string()));
    }
    Ok(match kind {
        ValueKind::Bool => PropertyValue::Bool(false),
        ValueKind::Int => PropertyValue::Int(0),
        ValueKind::Float => PropertyValue::Float(0.0),
        ValueKind::String => PropertyValue::String(String::new()),
        ValueKind::MultilineString => PropertyValue::MultilineString(String::new()),
        ValueKind::Color => PropertyValue::Color(Color::default()),
        ValueKind::Point => PropertyValue::Point(Point::default()),
        ValueKind::PointF => PropertyValue::PointF(PointF::default()),
        ValueKind::Rect => PropertyValue::Rect(Rect::default()),
        ValueKind::RectF => PropertyValue::RectF(RectF::default()),
        ValueKind::Size => PropertyValue::Size(Size::default()),
        ValueKind::FilePath => PropertyValue::FilePath(String::new()),
        ValueKind::ObjectRef => PropertyValue::ObjectRef(EntityId::new(0)),
        ValueKind::ClassRef => return Err(ActionResponse::err("类值需要类名")),
    })
}

/// 把脚本文本解释为属性值：沿用当前显示值（自身或继承）的种类，没有时作为字符串。
fn typed_value(document: &Document, path: &[String], text: &str) -> Result<PropertyValue, ActionResponse> {
    let text_value = PropertyValue::from(text);
    let Some(((name, members), current)) = path.split_first().zip(document.current_object()) else {
        return Ok(text_value);
    };
    let Some(resolved) = document.resolver().resolve(current, name) else {
        return Ok(text_value);
    };
    let existing = if members.is_empty() {
        Some(&resolved)
    } else {
        resolved.member(members)
    };
    match existing.map(PropertyValue::kind) {
        Some(ValueKind::ClassRef) | None => Ok(text_value),
        Some(kind) => convert(&text_value, kind).map_err(|err| ActionResponse::err(err.to_string())),
    }
}

fn is_composite(kind: ValueKind) -> bool {
    matches!(
        kind,
        ValueKind::Point | ValueKind::PointF | ValueKind::Rect | ValueKind::RectF | ValueKind::Size
    )
}

macro_rules! try_response {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(err) => return ActionResponse::from(err),
        }
    };
}

struct UndoAction;

impl ActionHandler for UndoAction {
    fn name(&self) -> &'static str {
        "undo"
    }

    fn execute(&self, _request: &ActionRequest, context: &mut ActionContext<'_>) -> ActionResponse {
        let text = context.document.history().undo_text().map(str::to_string);
        try_response!(context.document.undo());
        ActionResponse::ok(format!("已撤销: {}", text.unwrap_or_default()))
    }
}

struct RedoAction;

impl ActionHandler for RedoAction {
    fn name(&self) -> &'static str {
        "redo"
    }

    fn execute(&self, _request: &ActionRequest, context: &mut ActionContext<'_>) -> ActionResponse {
        let text = context.document.history().redo_text().map(str::to_string);
        try_response!(context.document.redo());
        ActionResponse::ok(format!("已重做: {}", text.unwrap_or_default()))
    }
}

struct SaveAction;

impl ActionHandler for SaveAction {
    fn name(&self) -> &'static str {
        "save"
    }

    fn execute(&self, _request: &ActionRequest, context: &mut ActionContext<'_>) -> ActionResponse {
        context.document.mark_saved();
        ActionResponse::ok("已标记保存点")
    }
}

struct SelectAction;

impl ActionHandler for SelectAction {
    fn name(&self) -> &'static str {
        "select"
    }

    fn execute(&self, request: &ActionRequest, context: &mut ActionContext<'_>) -> ActionResponse {
        let ids = match parse_ids(&request.args) {
            Ok(ids) => ids,
            Err(response) => return response,
        };
        try_response!(context.document.set_current_objects(ids));
        ActionResponse::ok(format!("已选中 {} 个对象", context.document.selection().len()))
    }
}

struct ClearSelectionAction;

impl ActionHandler for ClearSelectionAction {
    fn name(&self) -> &'static str {
        "clear_selection"
    }

    fn execute(&self, _request: &ActionRequest, context: &mut ActionContext<'_>) -> ActionResponse {
        context.document.clear_selection();
        ActionResponse::ok("选中集已清空")
    }
}

fn new_property(
    request: &ActionRequest,
    document: &Document,
) -> Result<(String, PropertyValue), ActionResponse> {
    let name = request.arg(0)?.to_string();
    let kind = parse_kind(request.arg(1)?)?;
    let value = initial_value(document, kind, &request.rest(2))?;
    Ok((name, value))
}

struct AddPropertyAction;

impl ActionHandler for AddPropertyAction {
    fn name(&self) -> &'static str {
        "add_property"
    }

    fn execute(&self, request: &ActionRequest, context: &mut ActionContext<'_>) -> ActionResponse {
        let (name, value) = match new_property(request, context.document) {
            Ok(parsed) => parsed,
            Err(response) => return response,
        };
        if try_response!(actions::add_property(context.document, &name, value)) {
            ActionResponse::ok(format!("已添加属性 {name}"))
        } else {
            ActionResponse::ok(format!("属性 {name} 已存在"))
        }
    }
}

struct SetPropertyAction;

impl ActionHandler for SetPropertyAction {
    fn name(&self) -> &'static str {
        "set_property"
    }

    fn execute(&self, request: &ActionRequest, context: &mut ActionContext<'_>) -> ActionResponse {
        let path = match request.arg(0) {
            Ok(name) => parse_path(name),
            Err(response) => return response,
        };
        let value = match typed_value(context.document, &path, &request.rest(1)) {
            Ok(value) => value,
            Err(response) => return response,
        };
        try_response!(actions::set_property_member(context.document, &path, value));
        ActionResponse::ok(format!("已设置属性 {}", path.join(".")))
    }
}

struct ResetPropertyAction;

impl ActionHandler for ResetPropertyAction {
    fn name(&self) -> &'static str {
        "reset_property"
    }

    fn execute(&self, request: &ActionRequest, context: &mut ActionContext<'_>) -> ActionResponse {
        let name = match request.arg(0) {
            Ok(name) => name,
            Err(response) => return response,
        };
        try_response!(actions::reset_property(context.document, name));
        ActionResponse::ok(format!("已重置属性 {name}"))
    }
}

struct RemovePropertyAction;

impl ActionHandler for RemovePropertyAction {
    fn name(&self) -> &'static str {
        "remove_property"
    }

    fn execute(&self, request: &ActionRequest, context: &mut ActionContext<'_>) -> ActionResponse {
        try_response!(actions::remove_properties(context.document, &request.args));
        ActionResponse::ok(format!("已删除 {} 个属性", request.args.len()))
    }
}

struct RenamePropertyAction;

impl ActionHandler for RenamePropertyAction {
    fn name(&self) -> &'static str {
        "rename_property"
    }

    fn execute(&self, request: &ActionRequest, context: &mut ActionContext<'_>) -> ActionResponse {
        let names = request.arg(0).and_then(|old| Ok((old, request.arg(1)?)));
        let (old, new) = match names {
            Ok(names) => names,
            Err(response) => return response,
        };
        try_response!(actions::rename_property(context.document, old, new));
        ActionResponse::ok(format!("已重命名属性 {old} -> {new}"))
    }
}

struct ConvertPropertyAction;

impl ActionHandler for ConvertPropertyAction {
    fn name(&self) -> &'static str {
        "convert_property"
    }

    fn execute(&self, request: &ActionRequest, context: &mut ActionContext<'_>) -> ActionResponse {
        let kind = match request.arg(0).and_then(parse_kind) {
            Ok(kind) => kind,
            Err(response) => return response,
        };
        let names = request.args.get(1..).unwrap_or_default();
        try_response!(actions::convert_properties(context.document, names, kind));
        ActionResponse::ok(format!("已将 {} 个属性转换为 {kind}", names.len()))
    }
}

struct CopyPropertiesAction;

impl ActionHandler for CopyPropertiesAction {
    fn name(&self) -> &'static str {
        "copy_properties"
    }

    fn execute(&self, request: &ActionRequest, context: &mut ActionContext<'_>) -> ActionResponse {
        context.clipboard = try_response!(actions::copy_properties(context.document, &request.args));
        ActionResponse::ok(format!("已复制 {} 个属性", context.clipboard.len()))
    }
}

struct CutPropertiesAction;

impl ActionHandler for CutPropertiesAction {
    fn name(&self) -> &'static str {
        "cut_properties"
    }

    fn execute(&self, request: &ActionRequest, context: &mut ActionContext<'_>) -> ActionResponse {
        context.clipboard = try_response!(actions::cut_properties(context.document, &request.args));
        ActionResponse::ok(format!("已剪切 {} 个属性", context.clipboard.len()))
    }
}

struct PastePropertiesAction;

impl ActionHandler for PastePropertiesAction {
    fn name(&self) -> &'static str {
        "paste_properties"
    }

    fn execute(&self, _request: &ActionRequest, context: &mut ActionContext<'_>) -> ActionResponse {
        let changed = try_response!(actions::paste_properties(context.document, &context.clipboard));
        ActionResponse::ok(format!("已粘贴到 {changed} 个对象"))
    }
}

struct SetClassAction;

impl ActionHandler for SetClassAction {
    fn name(&self) -> &'static str {
        "set_class"
    }

    fn execute(&self, request: &ActionRequest, context: &mut ActionContext<'_>) -> ActionResponse {
        let class_name = request.rest(0);
        try_response!(actions::set_class_name(context.document, &class_name));
        ActionResponse::ok(format!("类已设置为 {class_name:?}"))
    }
}

fn field_request(request: &ActionRequest) -> Result<(Field, PropertyValue), ActionResponse> {
    let field = parse_field(request.arg(0)?)?;
    Ok((field, PropertyValue::from(request.rest(1))))
}

struct SetFieldAction;

impl ActionHandler for SetFieldAction {
    fn name(&self) -> &'static str {
        "set_field"
    }

    fn execute(&self, request: &ActionRequest, context: &mut ActionContext<'_>) -> ActionResponse {
        let (field, value) = match field_request(request) {
            Ok(parsed) => parsed,
            Err(response) => return response,
        };
        if is_composite(field.value_kind()) {
            if !try_response!(actions::set_composite_field(context.document, field, value)) {
                return ActionResponse::ok(format!("{field} 未改变"));
            }
        } else {
            try_response!(actions::set_field(context.document, field, value));
        }
        ActionResponse::ok(format!("已设置 {field}"))
    }
}

struct DragFieldAction;

impl ActionHandler for DragFieldAction {
    fn name(&self) -> &'static str {
        "drag_field"
    }

    fn execute(&self, request: &ActionRequest, context: &mut ActionContext<'_>) -> ActionResponse {
        let (field, value) = match field_request(request) {
            Ok(parsed) => parsed,
            Err(response) => return response,
        };
        try_response!(actions::set_field_continuous(context.document, field, value));
        ActionResponse::ok(format!("正在调整 {field}"))
    }
}

struct BeginMacroAction;

impl ActionHandler for BeginMacroAction {
    fn name(&self) -> &'static str {
        "begin_macro"
    }

    fn execute(&self, request: &ActionRequest, context: &mut ActionContext<'_>) -> ActionResponse {
        let description = request.rest(0);
        context.document.begin_macro(description.as_str());
        ActionResponse::ok(format!("开始记录宏 {description:?}"))
    }
}

struct EndMacroAction;

impl ActionHandler for EndMacroAction {
    fn name(&self) -> &'static str {
        "end_macro"
    }

    fn execute(&self, _request: &ActionRequest, context: &mut ActionContext<'_>) -> ActionResponse {
        try_response!(context.document.end_macro());
        ActionResponse::ok("宏已结束")
    }
}

struct AddLayerAction;

impl ActionHandler for AddLayerAction {
    fn name(&self) -> &'static str {
        "add_layer"
    }

    fn execute(&self, request: &ActionRequest, context: &mut ActionContext<'_>) -> ActionResponse {
        let name = request.rest(0);
        let id = actions::add_entity(
            context.document,
            &name,
            EntityData::Container(LayerData::default()),
        );
        ActionResponse::ok(format!("已添加图层 {id}"))
    }
}

struct RemoveSelectedAction;

impl ActionHandler for RemoveSelectedAction {
    fn name(&self) -> &'static str {
        "remove_selected"
    }

    fn execute(&self, _request: &ActionRequest, context: &mut ActionContext<'_>) -> ActionResponse {
        let removed = try_response!(actions::remove_selected(context.document));
        ActionResponse::ok(format!("已删除 {removed} 个对象"))
    }
}
