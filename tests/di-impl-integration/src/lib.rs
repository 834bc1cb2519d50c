//! 集中集成测试工程，用例位于 `tests/` 目录
