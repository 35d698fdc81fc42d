//! # Command Module / 命令模块
//!
//! Process spawning with combined output capture, and the command templates
//! through which every external collaborator (environment manager, package
//! installer, test framework, coverage uploader) is invoked.
//!
//! 进程派生与合并输出捕获，以及调用每个外部协作者
//! （环境管理器、包安装器、测试框架、覆盖率上传器）所使用的命令模板。

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::core::errors::ConfigError;
use crate::infra::t;

/// Placeholders a command template may reference.
/// 命令模板可以引用的占位符。
pub const KNOWN_PLACEHOLDERS: &[&str] = &[
    "env_dir",
    "workdir",
    "version",
    "manifest",
    "project",
    "test_path",
    "coverage_namespace",
    "coverage_file",
    "license_file",
    "cell",
    "os",
    "variant",
];

/// Values substituted into `{placeholder}`s when a template is rendered.
/// 渲染模板时替换 `{placeholder}` 的值。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars(BTreeMap<&'static str, String>);

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &'static str, value: impl Into<String>) {
        self.0.insert(key, value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

/// A piece of a template word.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// Splits one word into literal text and `{placeholder}` references.
/// `{{` and `}}` are escaped braces; `${VAR}` is left alone for shell expansion.
fn segments(word: &str) -> Result<Vec<Segment>, String> {
    let mut out = Vec::new();
    let mut literal = String::new();
    let mut chars = word.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '$' if chars.peek() == Some(&'{') => {
                literal.push('$');
                for inner in chars.by_ref() {
                    literal.push(inner);
                    if inner == '}' {
                        break;
                    }
                }
            }
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == '}' {
                        closed = true;
                        break;
                    }
                    name.push(inner);
                }
                if !closed {
                    return Err(format!("unterminated placeholder '{{{name}'"));
                }
                if !literal.is_empty() {
                    out.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                out.push(Segment::Placeholder(name));
            }
            other => literal.push(other),
        }
    }
    if !literal.is_empty() {
        out.push(Segment::Literal(literal));
    }
    Ok(out)
}

/// A parsed, validated command line with `{placeholder}`s.
///
/// Parsing splits the source with shell-word rules, so a substituted value
/// containing spaces always stays a single argument.
///
/// 经过解析和校验的、带有 `{placeholder}` 的命令行。
/// 解析时按 shell 单词规则切分源字符串，因此包含空格的替换值始终保持为单个参数。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    name: String,
    source: String,
    words: Vec<String>,
}

impl CommandTemplate {
    pub fn parse(name: &str, source: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidTemplate {
            name: name.to_string(),
            reason,
        };

        let words = shlex::split(source)
            .ok_or_else(|| invalid(format!("cannot split '{source}' into words")))?;
        if words.is_empty() {
            return Err(invalid("empty command".to_string()));
        }

        for word in &words {
            for segment in segments(word).map_err(invalid)? {
                if let Segment::Placeholder(p) = segment {
                    if !KNOWN_PLACEHOLDERS.contains(&p.as_str()) {
                        return Err(invalid(format!(
                            "unknown placeholder '{{{p}}}'; write '{{{{' and '}}}}' for literal braces"
                        )));
                    }
                }
            }
        }

        Ok(Self {
            name: name.to_string(),
            source: source.to_string(),
            words,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Renders the template into a program and its arguments.
    /// Each word has `$VAR` / `~` expanded first, then placeholders substituted.
    ///
    /// Quotes are already gone at this point, so single quotes do not stop
    /// expansion: `'$HOME'` still expands, and a variable that is unset in
    /// the orchestrator's environment fails the render.
    ///
    /// 将模板渲染为程序及其参数。
    /// 每个单词先展开 `$VAR` / `~`，再替换占位符。
    /// 此时引号已被去除，因此单引号不会阻止展开：`'$HOME'` 仍会被展开，
    /// 而编排器环境中未设置的变量会导致渲染失败。
    pub fn render(&self, vars: &TemplateVars) -> Result<Vec<String>, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidTemplate {
            name: self.name.clone(),
            reason,
        };

        self.words
            .iter()
            .map(|word| {
                let expanded = shellexpand::full(word)
                    .map_err(|e| invalid(format!("failed to expand '{word}': {e}")))?;
                let mut rendered = String::new();
                for segment in segments(&expanded).map_err(invalid)? {
                    match segment {
                        Segment::Literal(text) => rendered.push_str(&text),
                        Segment::Placeholder(p) => {
                            let value = vars.get(&p).ok_or_else(|| {
                                invalid(format!("placeholder '{{{p}}}' has no value here"))
                            })?;
                            rendered.push_str(value);
                        }
                    }
                }
                Ok(rendered)
            })
            .collect()
    }
}

/// Quotes a rendered command back into a single, copy-pasteable line.
/// 将渲染后的命令重新引用为一行可复制粘贴的文本。
pub fn display_line(words: &[String]) -> String {
    shlex::try_join(words.iter().map(String::as_str)).unwrap_or_else(|_| words.join(" "))
}

/// Returns the last `max_lines` lines of `output`, for error messages.
/// 返回 `output` 的最后 `max_lines` 行，用于错误消息。
pub fn tail_lines(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}

/// Appends every line of `reader` to `output` until EOF. Bytes that are not
/// UTF-8 are replaced and reading continues.
async fn drain_lines<R>(mut reader: R, output: Arc<tokio::sync::Mutex<String>>)
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => output
                .lock()
                .await
                .push_str(&String::from_utf8_lossy(&line)),
        }
    }
}

/// Spawns a command, captures its stdout and stderr.
/// The output streams are read concurrently and combined into a single string.
///
/// # Arguments
/// * `cmd` - The `tokio::process::Command` to execute.
///
/// # Returns
/// A tuple containing:
/// - The `ExitStatus` of the process wrapped in an `io::Result`.
/// - The combined stdout and stderr as a `String`.
///
/// 派生一个命令，捕获其 stdout 和 stderr。
/// 输出流被并发读取并合并到一个字符串中。
pub async fn spawn_and_capture(
    mut cmd: tokio::process::Command,
) -> (std::io::Result<std::process::ExitStatus>, String) {
    let mut child = match cmd
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => return (Err(e), String::new()),
    };

    let stdout = match child.stdout.take() {
        Some(stdout) => stdout,
        None => {
            return (
                Err(std::io::Error::other(t!("command.capture_stdout_failed").to_string())),
                String::new(),
            );
        }
    };
    let stderr = match child.stderr.take() {
        Some(stderr) => stderr,
        None => {
            return (
                Err(std::io::Error::other(t!("command.capture_stderr_failed").to_string())),
                String::new(),
            );
        }
    };

    // Both readers append to the same buffer so interleaving roughly follows the process.
    // 两个读取任务写入同一个缓冲区。
    let output = Arc::new(tokio::sync::Mutex::new(String::new()));

    let stdout_output = Arc::clone(&output);
    let stdout_handle = tokio::spawn(async move {
        drain_lines(BufReader::new(stdout), stdout_output).await;
    });

    let stderr_output = Arc::clone(&output);
    let stderr_handle = tokio::spawn(async move {
        drain_lines(BufReader::new(stderr), stderr_output).await;
    });

    let status = child.wait().await;

    // Wait for the readers so no trailing output is lost.
    // 等待读取任务完成，以确保所有输出都被捕获。
    if let Err(e) = stdout_handle.await {
        eprintln!("{}", t!("command.join_failed", stream = "stdout", error = e));
    }
    if let Err(e) = stderr_handle.await {
        eprintln!("{}", t!("command.join_failed", stream = "stderr", error = e));
    }

    let captured = output.lock().await.clone();
    (status, captured)
}
