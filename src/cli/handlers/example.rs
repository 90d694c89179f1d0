// src/cli/handlers/example.rs

use colored::Colorize;

const EXAMPLE_COMMANDS: &str = "\
    $ export WDM_DEPENDENCY_FILE=...
    $ wdm test has_nfd
    $ wdm ensure has_gpu_operator";

/// A complete dependency file: `has_gpu_operator` requires `has_nfd`.
pub const EXAMPLE_DEPENDENCY_FILE: &str = "\
---
name: has_gpu_operator
spec:
  requirements:
  - has_nfd
  test:
  - name: has_gpu_operator_pods
    type: shell
    spec: oc get pod -l app.kubernetes.io/component=gpu-operator -A -oname
  install:
  - name: install_gpu_operator
    type: shell
    spec: ./run_toolbox.py gpu_operator deploy_from_operatorhub
  - name: wait_gpu_operator
    type: shell
    spec: ./run_toolbox.py gpu_operator wait_deployment
---
name: has_nfd
spec:
  test:
  - name: has_nfd_labels
    type: shell
    spec: ./run_toolbox.py nfd has_labels
  install:
  - name: install_nfd_from_operatorhub
    type: shell
    spec: ./run_toolbox.py nfd_operator deploy_from_operatorhub
";

pub fn handle() {
    println!("{}", "Examples:".bold());
    println!("{}", EXAMPLE_COMMANDS.cyan());
    print!("{}", EXAMPLE_DEPENDENCY_FILE);
}
