/// Host that runs nfdump on our behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteHost {
    pub host: String,
    pub user: Option<String>,
    pub port: Option<u16>,
    pub jump_host: Option<String>,
}

impl RemoteHost {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: None,
            port: None,
            jump_host: None,
        }
    }
}

pub fn build_ssh_args(remote: &RemoteHost, argv: &[String]) -> Vec<String> {
    // 构造非交互式 SSH 调用，远端命令由 shell 解释。
    let mut args = Vec::new();
    args.push("-o".to_string());
    args.push("BatchMode=yes".to_string());

    if let Some(port) = remote.port {
        args.push("-p".to_string());
        args.push(port.to_string());
    }

    if let Some(jump) = &remote.jump_host {
        // 支持堡垒机跳转且不改变调用方逻辑。
        args.push("-J".to_string());
        args.push(jump.clone());
    }

    let target = match &remote.user {
        Some(u) => format!("{u}@{}", remote.host),
        None => remote.host.clone(),
    };
    args.push(target);

    // ssh 会把剩余参数拼成一条命令，这里自行拼接并转义。
    args.push("--".to_string());
    args.push(remote_command(argv));

    args
}

pub fn remote_command(argv: &[String]) -> String {
    argv.iter()
        .map(|a| shell_quote(a))
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_shell_safe(input: &str) -> bool {
    input
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_./:,=@%+".contains(c))
}

pub fn shell_quote(input: &str) -> String {
    // 远程命令经 shell 执行，必须保证引号安全。
    if input.is_empty() {
        return "''".to_string();
    }
    if is_shell_safe(input) {
        return input.to_string();
    }
    let escaped = input.replace('\'', "'\\''");
    format!("'{escaped}'")
}
